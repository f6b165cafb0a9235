pub use self::message::Message;
mod message;

pub use self::serial::Serial;
mod serial;

#[cfg(test)]
mod tests;
