//! HTTP API handlers for ech-dash

pub mod dictionary;
pub mod health;
pub mod options;
pub mod sessions;
pub mod sse;
pub mod table;
pub mod ui;

pub use dictionary::get_dictionary;
pub use health::health_routes;
pub use options::get_options;
pub use sessions::{create_session, delete_session, get_session, post_control};
pub use sse::event_stream;
pub use table::{export_table_csv, get_table_data};
pub use ui::{serve_app_js, serve_index};
