mod status;

pub use self::status::Status;
