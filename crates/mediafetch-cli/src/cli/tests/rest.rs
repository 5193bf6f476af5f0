//! Tests for status, info, remove and reap.

use super::parse;
use crate::cli::{CliCommand, DEFAULT_OWNER};

#[test]
fn cli_parse_status_list() {
    match parse(&["mediafetch", "status"]) {
        CliCommand::Status {
            id,
            owner,
            json,
            limit,
        } => {
            assert!(id.is_none());
            assert_eq!(owner, DEFAULT_OWNER);
            assert!(!json);
            assert_eq!(limit, 20);
        }
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_one_json() {
    match parse(&["mediafetch", "status", "42", "--json", "--owner", "x"]) {
        CliCommand::Status { id, owner, json, .. } => {
            assert_eq!(id, Some(42));
            assert_eq!(owner, "x");
            assert!(json);
        }
        _ => panic!("expected Status with id"),
    }
}

#[test]
fn cli_parse_info() {
    match parse(&["mediafetch", "info", "https://youtu.be/abc"]) {
        CliCommand::Info { url } => assert_eq!(url, "https://youtu.be/abc"),
        _ => panic!("expected Info"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["mediafetch", "remove", "7"]) {
        CliCommand::Remove { id, owner } => {
            assert_eq!(id, 7);
            assert_eq!(owner, DEFAULT_OWNER);
        }
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_reap() {
    match parse(&["mediafetch", "reap"]) {
        CliCommand::Reap { older_than_mins } => assert_eq!(older_than_mins, 60),
        _ => panic!("expected Reap"),
    }
    match parse(&["mediafetch", "reap", "--older-than-mins", "5"]) {
        CliCommand::Reap { older_than_mins } => assert_eq!(older_than_mins, 5),
        _ => panic!("expected Reap with threshold"),
    }
}
