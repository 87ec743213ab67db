//! Tag-Length-Value container format
//!
//! This is inspired by the PNG file format and frames everything stored in
//! an archive as a flat sequence of self-describing records.
//!
//! # Top Level
//!
//! A container is a sequence of records with the following on disk format.
//! Unless otherwise noted everything is stored in Big Endian format; the
//! byte order is fixed so that a container written on one architecture is
//! readable on any other.
//!
//! | Type    | Name   | Description |
//! | ------: | ------ | ----------- |
//! | [u8; 4] | tag    | The type of the record, ASCII such as `FILE` |
//! | u32     | length | The length of the value section, is allowed to be 0 bytes |
//! | [u8; N] | value  | The content of the record, interpret according to the tag |
//!
//! The length always equals the exact number of value bytes physically
//! present. A reader that cannot consume `length` bytes has hit a truncated
//! container. Records with an unrecognized tag are skipped over using the
//! declared length.
//!
//! # Record Types
//!
//! | Tag    | Name           | Description |
//! | :----: | -------------- | ----------- |
//! | `DIR ` | Directory      | Value is the directory path relative to the archive root |
//! | `FILE` | File           | Value nests a `NAME` record then a `DATA` or `DREF` record |
//! | `NAME` | File Name      | Value is the file path relative to the archive root |
//! | `DATA` | File Content   | Value is the raw file content bytes |
//! | `DREF` | Content Ref    | Value is the u32 entry offset of the origin `FILE` record |
//!
//! ## DIR
//!
//! A standalone top level record. Directories carry no content and no
//! parent/child linkage, the tree is rebuilt purely from the path strings at
//! extract time. Emitted for every directory including empty ones so that
//! empty directories round-trip.
//!
//! ## FILE
//!
//! The only record with nested sub-records. Its value is a `NAME` record
//! followed by exactly one of `DATA` (this record owns its content) or
//! `DREF` (the content is identical to the content owned by the `FILE`
//! record whose header begins at the referenced offset). Unrecognized
//! sub-records within the value bounds are skipped. The offset of the
//! `FILE` header itself is the record's identity for `DREF` targets.
//!
//! ## DREF
//!
//! | Type | Name   | Description |
//! | ---: | ------ | ----------- |
//! | u32  | offset | Entry offset of the origin `FILE` record header |
//!
//! A reference must resolve to a record that owns a `DATA` payload. Chained
//! references are malformed input.
pub mod builder;
pub mod reader;

use thiserror::Error;

pub type Tag = [u8; 4];

pub const DIR: Tag = *b"DIR ";
pub const FILE: Tag = *b"FILE";
pub const NAME: Tag = *b"NAME";
pub const DATA: Tag = *b"DATA";
pub const DREF: Tag = *b"DREF";

// tag + length
pub const HEADER_SIZE: u32 = 8;

// Only paths and ref payloads are ever materialized in memory, bound them so
// a corrupt length field can't trigger a giant allocation. DATA payloads are
// streamed or skipped and are not subject to this limit.
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum TlvError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("container truncated mid-record")]
    Truncated,
    #[error("permitted max inline payload size exceeded")]
    MaxLength,
}
