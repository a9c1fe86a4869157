pub mod i_am;
pub mod who_is;

pub use i_am::IAmRequest;
pub use who_is::WhoIsRequest;
