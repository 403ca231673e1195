pub mod add_client;
pub mod client_list;
pub mod custom_headers;
