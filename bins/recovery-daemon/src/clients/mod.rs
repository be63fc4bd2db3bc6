pub mod channel_http;
