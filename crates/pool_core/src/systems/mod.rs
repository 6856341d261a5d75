pub mod batch_assignment;
pub mod request_inbound;
