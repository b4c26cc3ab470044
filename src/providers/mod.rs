pub mod exchange_api;
