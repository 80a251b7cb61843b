//! DynamoDB item store.
//!
//! Implements [`ItemStore`] on top of `aws-sdk-dynamodb`.

use async_trait::async_trait;
use aws_sdk_dynamodb::config::retry::RetryConfig;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::{
    KeysAndAttributes, Put, ReturnValuesOnConditionCheckFailure, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;

use quickphotos_core::storage::{IndexTarget, StoreError, TableKey};

use crate::config::Config;
use crate::storage::codec;
use crate::storage::store::{
    BatchGetOutput, Item, ItemStore, QueryPage, QueryRequest, WriteOp, BATCH_GET_LIMIT,
};

use super::error::{
    map_batch_get_item_error, map_get_item_error, map_query_error, map_transact_write_error,
};
use super::expressions::{self, ATTRIBUTE_EXISTS, ATTRIBUTE_NOT_EXISTS};

/// DynamoDB-backed store for the single quick-photos table.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table_name: String,
    index_name: String,
}

impl DynamoDbStore {
    /// Creates a store over an existing client.
    pub fn new(client: Client, table_name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            index_name: index_name.into(),
        }
    }

    /// Builds a client from configuration.
    ///
    /// Uses the AWS SDK default credential chain. SDK retries are disabled so
    /// callers see every transient failure, and each operation is bounded by
    /// the configured request timeout.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.request_timeout())
                    .build(),
            );
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        tracing::debug!(
            table = %config.table_name,
            region = %config.region,
            endpoint = ?config.endpoint_url,
            "dynamodb client configured"
        );

        Self::new(
            Client::new(&sdk_config),
            &config.table_name,
            &config.index_name,
        )
    }

    fn transact_item(&self, op: WriteOp) -> Result<TransactWriteItem, StoreError> {
        let item = match op {
            WriteOp::PutIfAbsent { item } => {
                let put = Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(item))
                    .condition_expression(ATTRIBUTE_NOT_EXISTS)
                    .return_values_on_condition_check_failure(
                        ReturnValuesOnConditionCheckFailure::AllOld,
                    )
                    .build()
                    .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
                TransactWriteItem::builder().put(put).build()
            }
            WriteOp::Increment { key, counter, by } => {
                let expr = expressions::increment(&counter, by);
                let update = Update::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(codec::key_to_item(&key)))
                    .update_expression(expr.expression)
                    .condition_expression(ATTRIBUTE_EXISTS)
                    .set_expression_attribute_names(Some(expr.names))
                    .set_expression_attribute_values(Some(expr.values))
                    .return_values_on_condition_check_failure(
                        ReturnValuesOnConditionCheckFailure::AllOld,
                    )
                    .build()
                    .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
                TransactWriteItem::builder().update(update).build()
            }
        };
        Ok(item)
    }
}

fn key_of(item: &Item) -> Result<TableKey, StoreError> {
    codec::item_key(item).map_err(|e| StoreError::InvalidRequest(e.to_string()))
}

#[async_trait]
impl ItemStore for DynamoDbStore {
    async fn get_item(&self, key: &TableKey) -> Result<Option<Item>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(codec::key_to_item(key)))
            .send()
            .await
            .map_err(map_get_item_error)?;

        Ok(result.item)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage, StoreError> {
        let expr = expressions::key_condition(request.index, &request.condition);

        let mut builder = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression(expr.expression)
            .set_expression_attribute_names(Some(expr.names))
            .set_expression_attribute_values(Some(expr.values))
            .scan_index_forward(request.scan_forward)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_limit(request.limit);
        if request.index == IndexTarget::InvertedIndex {
            builder = builder.index_name(&self.index_name);
        }

        let result = builder
            .send()
            .await
            .map_err(|e| map_query_error(e, &self.index_name))?;

        Ok(QueryPage {
            items: result.items.unwrap_or_default(),
            last_evaluated_key: result.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn batch_get_items(&self, keys: &[TableKey]) -> Result<BatchGetOutput, StoreError> {
        if keys.len() > BATCH_GET_LIMIT {
            return Err(StoreError::InvalidRequest(format!(
                "BatchGetItem accepts at most {BATCH_GET_LIMIT} keys, got {}",
                keys.len()
            )));
        }
        if keys.is_empty() {
            return Ok(BatchGetOutput::default());
        }

        let request = KeysAndAttributes::builder()
            .set_keys(Some(keys.iter().map(codec::key_to_item).collect()))
            .consistent_read(false)
            .build()
            .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;

        let result = self
            .client
            .batch_get_item()
            .request_items(&self.table_name, request)
            .send()
            .await
            .map_err(map_batch_get_item_error)?;

        let items = result
            .responses
            .and_then(|mut responses| responses.remove(&self.table_name))
            .unwrap_or_default();

        let unprocessed_keys = match result
            .unprocessed_keys
            .and_then(|mut unprocessed| unprocessed.remove(&self.table_name))
        {
            Some(pending) => pending
                .keys()
                .iter()
                .map(key_of)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(BatchGetOutput {
            items,
            unprocessed_keys,
        })
    }

    async fn transact_write_items(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let items = ops
            .into_iter()
            .map(|op| self.transact_item(op))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(map_transact_write_error)?;

        Ok(())
    }
}
