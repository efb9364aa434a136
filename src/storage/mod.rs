pub mod cursor;
pub mod node;
pub mod pager;
pub mod row;
pub mod table;

pub use row::{Row, EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH};
pub use table::{insert_row, render_btree, select_rows, Table};
