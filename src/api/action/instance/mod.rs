pub(crate) mod deploy;
pub(crate) mod get;
pub(crate) mod list;

pub(crate) use deploy::deploy;
pub(crate) use get::get;
pub(crate) use list::list;
