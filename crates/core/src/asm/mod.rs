pub mod amd64;
