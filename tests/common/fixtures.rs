//! Reusable engine scripts and config snippets.

/// App name written into every test project's `stagehand.toml`
pub const APP: &str = "shop";

/// Personal stage pre-selected for test projects
pub const STAGE: &str = "alice";

/// Engine that reports two resources and finishes.
///
/// Invoked as `sh engine.sh <command>`.
pub const ENGINE_OK: &str = r#"#!/bin/sh
echo '{"type":"progress","resource":"Bucket","status":"creating"}'
echo '{"type":"progress","resource":"Api","status":"creating"}'
echo "engine ran $1 for $STAGEHAND_APP/$STAGEHAND_STAGE"
echo '{"type":"finished","summary":{"created":2}}'
"#;

/// Engine that reports a failure
pub const ENGINE_FAIL: &str = r#"#!/bin/sh
echo '{"type":"progress","resource":"Bucket","status":"creating"}'
echo '{"type":"error","message":"bucket name taken"}'
exit 1
"#;

/// Engine that records every command it was asked to run
pub const ENGINE_RECORDING: &str = r#"#!/bin/sh
echo "$1" >> engine.log
echo '{"type":"finished","summary":{}}'
"#;
