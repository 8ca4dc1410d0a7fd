use {
    ethrpc::RpcError,
    std::time::Duration,
    tokio::time::Instant,
};

/// Time limits of a single verification.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timeouts {
    rpc: Duration,
    deadline: Option<Instant>,
}

impl Timeouts {
    pub fn new(rpc: Duration, search_deadline: Option<Duration>) -> Self {
        Self {
            rpc,
            deadline: search_deadline.map(|limit| Instant::now() + limit),
        }
    }

    /// Time the next RPC request may take, `None` once the deadline passed.
    pub fn next_request(&self) -> Option<Duration> {
        match self.deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                (!left.is_zero()).then(|| left.min(self.rpc))
            }
            None => Some(self.rpc),
        }
    }

    pub fn expired(&self) -> bool {
        self.next_request().is_none()
    }

    /// Runs an RPC request, timing out like an unreachable node.
    pub async fn bounded<T, E>(&self, request: impl Future<Output = Result<T, E>>) -> Result<T, E>
    where
        E: From<RpcError>,
    {
        let Some(limit) = self.next_request() else {
            return Err(RpcError::Timeout(Duration::ZERO).into());
        };
        tokio::time::timeout(limit, request)
            .await
            .unwrap_or_else(|_| Err(RpcError::Timeout(limit).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_requests_time_out() {
        let timeouts = Timeouts::new(Duration::from_secs(10), None);
        let result: Result<(), RpcError> = timeouts
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(11)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(RpcError::Timeout(limit)) if limit == Duration::from_secs(10)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_shortens_requests() {
        let timeouts = Timeouts::new(Duration::from_secs(10), Some(Duration::from_secs(3)));
        assert_eq!(timeouts.next_request(), Some(Duration::from_secs(3)));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(timeouts.next_request(), Some(Duration::from_secs(1)));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(timeouts.expired());
    }
}
