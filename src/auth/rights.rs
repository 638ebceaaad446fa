//! Access rights
//!
//! Per-account permission bitmask checked by the command dispatcher.

use bitflags::bitflags;
use serde::Deserialize;

bitflags! {
    /// Rights granted to an account. A command runs only if every bit it
    /// requires is present.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AccessRights: u8 {
        /// Download files and query their metadata.
        const READ = 0x01;
        /// Upload, delete, create and remove.
        const WRITE = 0x02;
        /// List directory contents.
        const LIST = 0x04;
        /// Change the working directory.
        const DIR = 0x08;
    }
}

/// A single right as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Right {
    Read,
    Write,
    List,
    Dir,
}

impl From<Right> for AccessRights {
    fn from(right: Right) -> Self {
        match right {
            Right::Read => AccessRights::READ,
            Right::Write => AccessRights::WRITE,
            Right::List => AccessRights::LIST,
            Right::Dir => AccessRights::DIR,
        }
    }
}

impl FromIterator<Right> for AccessRights {
    fn from_iter<I: IntoIterator<Item = Right>>(iter: I) -> Self {
        iter.into_iter()
            .fold(AccessRights::empty(), |acc, right| acc | right.into())
    }
}
