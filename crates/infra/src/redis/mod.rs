//! Redis-backed dispatch channel.

pub mod dispatch_channel;

pub use dispatch_channel::RedisDispatchChannel;
