//! Session recording and replay.
//!
//! Every request and every wait outcome is appended to a text recording, one
//! event per line. Reading the lines back in order reconstructs the exact
//! call/response sequence, and [`replayer::reissue_recording`] re-drives it
//! through the client to prove the recording reproduces itself.

pub mod recorder;
pub mod recording;
pub mod replayer;
