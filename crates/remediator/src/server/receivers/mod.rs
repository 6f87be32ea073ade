mod alertmanager;

pub use alertmanager::{diagnose, Diagnosis, NoPayloadReason};
