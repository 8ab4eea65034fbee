//! Track lifecycle of a room: starting a track, reacting to its end, and
//! advancing the queue. All of it runs with the room's lock held.

mod advance;
mod monitor;
mod start;
