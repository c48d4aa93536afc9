pub mod db;
pub mod intake;
