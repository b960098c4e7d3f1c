pub mod api_router;
pub mod core;
pub mod leads;
pub mod main_module;
pub mod pipelines;
pub mod reports;
