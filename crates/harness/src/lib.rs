pub mod address;
pub mod peer;
pub mod timesheet;

pub use address::{address_schema, AddressAdapter};
pub use peer::TestPeer;
pub use timesheet::{timesheet_schema, TimesheetAdapter};
