//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreError` from `quickphotos_core::storage`,
//! one function per operation.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use quickphotos_core::storage::StoreError;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Unwraps the service error, or maps transport and construction failures.
fn service_error<E, R>(err: SdkError<E, R>, operation: &str) -> Result<E, StoreError>
where
    E: std::error::Error + 'static,
    R: Debug,
{
    match err {
        SdkError::ServiceError(context) => Ok(context.into_err()),
        SdkError::ConstructionFailure(_) => Err(StoreError::InvalidRequest(format!(
            "{operation} request could not be built: {}",
            DisplayErrorContext(&err)
        ))),
        other => Err(StoreError::Unavailable(format!(
            "{operation} failed: {}",
            DisplayErrorContext(&other)
        ))),
    }
}

/// Classifies service errors the SDK does not model, by error code.
fn unmodeled(code: Option<&str>, message: Option<&str>, operation: &str) -> StoreError {
    let message = message.unwrap_or("no message");
    match code {
        Some(
            "ThrottlingException"
            | "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded"
            | "InternalServerError"
            | "ServiceUnavailable",
        ) => StoreError::Unavailable(format!("{operation} failed, please retry: {message}")),
        Some(code) => StoreError::InvalidRequest(format!("{operation} failed ({code}): {message}")),
        None => StoreError::Unavailable(format!("{operation} failed: {message}")),
    }
}

/// Returns true when a query failed because its index is still backfilling.
///
/// DynamoDB reports this as a `ValidationException` whose message mentions
/// the backfilling index.
pub fn is_backfill_error(code: Option<&str>, message: Option<&str>) -> bool {
    code == Some("ValidationException")
        && message.is_some_and(|m| m.to_ascii_lowercase().contains("backfilling"))
}

/// Map a GetItem SDK error to StoreError.
pub fn map_get_item_error<R: Debug>(err: SdkError<GetItemError, R>) -> StoreError {
    let err = match service_error(err, "GetItem") {
        Ok(err) => err,
        Err(mapped) => return mapped,
    };
    match err {
        GetItemError::ResourceNotFoundException(_) => {
            StoreError::InvalidRequest("Table not found".to_string())
        }
        GetItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::Unavailable("Throughput exceeded, please retry".to_string())
        }
        GetItemError::RequestLimitExceeded(_) => {
            StoreError::Unavailable("Request limit exceeded, please retry".to_string())
        }
        GetItemError::InternalServerError(_) => {
            StoreError::Unavailable("DynamoDB internal server error".to_string())
        }
        err => unmodeled(err.code(), err.message(), "GetItem"),
    }
}

/// Map a Query SDK error to StoreError.
pub fn map_query_error<R: Debug>(err: SdkError<QueryError, R>, index_name: &str) -> StoreError {
    let err = match service_error(err, "Query") {
        Ok(err) => err,
        Err(mapped) => return mapped,
    };
    if is_backfill_error(err.code(), err.message()) {
        return StoreError::BackfillPending {
            index: index_name.to_string(),
        };
    }
    match err {
        QueryError::ResourceNotFoundException(_) => {
            StoreError::InvalidRequest("Table or index not found".to_string())
        }
        QueryError::ProvisionedThroughputExceededException(_) => {
            StoreError::Unavailable("Throughput exceeded, please retry".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            StoreError::Unavailable("Request limit exceeded, please retry".to_string())
        }
        QueryError::InternalServerError(_) => {
            StoreError::Unavailable("DynamoDB internal server error".to_string())
        }
        err => unmodeled(err.code(), err.message(), "Query"),
    }
}

/// Map a BatchGetItem SDK error to StoreError.
pub fn map_batch_get_item_error<R: Debug>(err: SdkError<BatchGetItemError, R>) -> StoreError {
    let err = match service_error(err, "BatchGetItem") {
        Ok(err) => err,
        Err(mapped) => return mapped,
    };
    match err {
        BatchGetItemError::ResourceNotFoundException(_) => {
            StoreError::InvalidRequest("Table not found".to_string())
        }
        BatchGetItemError::ProvisionedThroughputExceededException(_) => {
            StoreError::Unavailable("Throughput exceeded, please retry".to_string())
        }
        BatchGetItemError::RequestLimitExceeded(_) => {
            StoreError::Unavailable("Request limit exceeded, please retry".to_string())
        }
        BatchGetItemError::InternalServerError(_) => {
            StoreError::Unavailable("DynamoDB internal server error".to_string())
        }
        err => unmodeled(err.code(), err.message(), "BatchGetItem"),
    }
}

/// Map a TransactWriteItems SDK error to StoreError.
pub fn map_transact_write_error<R: Debug>(
    err: SdkError<TransactWriteItemsError, R>,
) -> StoreError {
    let err = match service_error(err, "TransactWriteItems") {
        Ok(err) => err,
        Err(mapped) => return mapped,
    };
    match err {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => classify_cancellation(
            cancelled
                .cancellation_reasons()
                .iter()
                .map(|reason| reason.code()),
        ),
        TransactWriteItemsError::TransactionInProgressException(_) => {
            StoreError::Unavailable("Transaction in progress, please retry".to_string())
        }
        TransactWriteItemsError::IdempotentParameterMismatchException(_) => {
            StoreError::InvalidRequest("Idempotency token reused with different input".to_string())
        }
        TransactWriteItemsError::ResourceNotFoundException(_) => {
            StoreError::InvalidRequest("Table not found".to_string())
        }
        TransactWriteItemsError::ProvisionedThroughputExceededException(_) => {
            StoreError::Unavailable("Throughput exceeded, please retry".to_string())
        }
        TransactWriteItemsError::RequestLimitExceeded(_) => {
            StoreError::Unavailable("Request limit exceeded, please retry".to_string())
        }
        TransactWriteItemsError::InternalServerError(_) => {
            StoreError::Unavailable("DynamoDB internal server error".to_string())
        }
        err => unmodeled(err.code(), err.message(), "TransactWriteItems"),
    }
}

/// Turns per-operation cancellation reason codes into a StoreError.
///
/// Reasons are positional: entry `i` describes transaction operation `i`,
/// with `None` or `"None"` for operations that did not fail.
pub fn classify_cancellation<'a>(codes: impl IntoIterator<Item = Option<&'a str>>) -> StoreError {
    let codes: Vec<Option<&str>> = codes.into_iter().collect();

    if let Some(operation) = codes
        .iter()
        .position(|code| *code == Some(CONDITIONAL_CHECK_FAILED))
    {
        return StoreError::ConditionCheckFailed { operation };
    }

    let failed: Vec<&str> = codes
        .iter()
        .flatten()
        .copied()
        .filter(|code| *code != "None")
        .collect();

    let transient = failed.iter().any(|code| {
        matches!(
            *code,
            "TransactionConflict" | "ThrottlingError" | "ProvisionedThroughputExceeded"
        )
    });

    let message = format!("Transaction cancelled: [{}]", failed.join(", "));
    if transient {
        StoreError::Unavailable(message)
    } else {
        StoreError::InvalidRequest(message)
    }
}
