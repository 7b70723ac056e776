pub mod batch;
pub mod file;
pub mod text;
pub mod time;

pub use batch::batched;
pub use file::{list_csv_files, FileEntry};
pub use text::{
    format_compact, format_compact_decimal, format_currency, format_percentage, format_signed,
    format_thousands, truncate_to_width,
};
pub use time::{format_trade_time, snapshot_timestamp_slug, today};
