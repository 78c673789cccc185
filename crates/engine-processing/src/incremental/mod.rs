pub mod late_data;
pub mod quarantine;
pub mod watermark;
