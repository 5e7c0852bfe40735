//! 鎖競爭重試

use cutplan_core::RetryPolicy;
use std::future::Future;

use crate::store::StoreError;

/// 以重試策略執行遠端操作
///
/// 只重試鎖競爭類錯誤；第 n 次失敗後等待 n × 步長。其他錯誤立即回傳，
/// 重試用盡時回傳最後一次錯誤。
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && err.is_transient(policy) => {
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    "{} 遇到鎖競爭（第 {}/{} 次），{} ms 後重試: {}",
                    operation,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
