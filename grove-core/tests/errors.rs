//! Stable error codes and messages.

use std::path::PathBuf;

use grove_core::{IndexError, IndexErrorCode, ObjectError, ObjectErrorCode, ObjectType};
use rstest::rstest;

#[rstest]
#[case(
    ObjectError::DimensionMismatch { expected: 4, actual: 2 },
    ObjectErrorCode::DimensionMismatch,
    "OBJECT_DIMENSION_MISMATCH",
)]
#[case(
    ObjectError::NonFinite { index: 1, value: f64::NAN },
    ObjectErrorCode::NonFinite,
    "OBJECT_NON_FINITE",
)]
#[case(
    ObjectError::OutOfRange { index: 0, value: 300.0, object_type: ObjectType::Uint8 },
    ObjectErrorCode::OutOfRange,
    "OBJECT_OUT_OF_RANGE",
)]
fn object_error_codes_are_stable(
    #[case] error: ObjectError,
    #[case] expected: ObjectErrorCode,
    #[case] text: &str,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(expected.as_str(), text);
    let wrapped = IndexError::from(error);
    assert_eq!(wrapped.code(), IndexErrorCode::InvalidObject);
    assert_eq!(wrapped.object_code(), Some(expected));
}

#[rstest]
#[case(IndexError::NotFound { id: 9 }, IndexErrorCode::NotFound, "INDEX_NOT_FOUND")]
#[case(IndexError::Removed { id: 9 }, IndexErrorCode::Removed, "INDEX_REMOVED")]
#[case(IndexError::ClosedIndex, IndexErrorCode::ClosedIndex, "INDEX_CLOSED")]
#[case(
    IndexError::Corrupt { path: PathBuf::from("snapshot.bin"), reason: "bad crc".into() },
    IndexErrorCode::Corrupt,
    "INDEX_CORRUPT",
)]
#[case(
    IndexError::LockPoisoned { resource: "index state" },
    IndexErrorCode::LockPoisoned,
    "INDEX_LOCK_POISONED",
)]
#[case(
    IndexError::GraphInvariant { message: "dangling edge".into() },
    IndexErrorCode::GraphInvariant,
    "INDEX_GRAPH_INVARIANT",
)]
fn index_error_codes_are_stable(
    #[case] error: IndexError,
    #[case] expected: IndexErrorCode,
    #[case] text: &str,
) {
    assert_eq!(error.code(), expected);
    assert_eq!(error.code().to_string(), text);
    assert_eq!(error.object_code(), None);
}

#[test]
fn messages_carry_their_context() {
    let error = IndexError::Corrupt {
        path: PathBuf::from("/data/index/snapshot.bin"),
        reason: "checksum mismatch".into(),
    };
    assert_eq!(
        error.to_string(),
        "corrupt index data at /data/index/snapshot.bin: checksum mismatch"
    );
    let error = IndexError::ReadOnly { operation: "insert" };
    assert_eq!(
        error.to_string(),
        "index was opened read-only; `insert` is not permitted"
    );
}
