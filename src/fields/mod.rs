pub mod address;
pub mod classify;
pub mod front;

pub use address::{parse_address, AddressExtractor};
pub use classify::{classify, Ambiguity, Candidate, Classification};
pub use front::{extract_dob, extract_gender, extract_id_number, extract_name, FrontFieldExtractor};
