//! Integration-style tests for the downloader, driven through its public API
//! with a scripted in-process resolver.


pub(crate) use super::test_helpers::{
    create_test_downloader, create_test_downloader_with, events_until_terminal, FakeScript,
};
pub(crate) use crate::error::{DownloadError, Error};
pub(crate) use crate::types::{DownloadRequest, Event, MediaKind, Status, TaskHandle};
