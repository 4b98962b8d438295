//! The atomic fixed-window increment-and-check script.
//!
//! Expressed as a single Lua script so the increment, the conditional
//! `PEXPIRE`, and the `PTTL` read happen as one atomic unit on the server
//! side. The only write is an unconditional `INCR`; rejection is derived
//! from the value it returns. See the unscripted fallback below for the
//! non-atomic, pipelined shape of the same idea.

use ratekeeper_core::{BackendError, Decision};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

const FIXED_WINDOW_SCRIPT: &str = r"
local current = redis.call('INCR', KEYS[1])
local ttl
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[2])
    ttl = tonumber(ARGV[2])
else
    ttl = redis.call('PTTL', KEYS[1])
    if ttl < 0 then
        redis.call('PEXPIRE', KEYS[1], ARGV[2])
        ttl = tonumber(ARGV[2])
    end
end
if current > tonumber(ARGV[1]) then
    return {ttl, current}
else
    return {0, current}
end
";

pub(crate) struct FixedWindowScript {
    script: Script,
}

impl FixedWindowScript {
    pub(crate) fn new() -> Self {
        Self {
            script: Script::new(FIXED_WINDOW_SCRIPT),
        }
    }

    /// Runs the script against `key`, returning the resulting [`Decision`].
    ///
    /// Falls back to a manual `INCR`/`PEXPIRE`/`PTTL` sequence when `EVALSHA`
    /// is rejected because server-side scripting is disabled (some managed
    /// Redis-compatible stores turn it off). The sequence is not atomic in
    /// that path, which is why the scripted path is preferred whenever it is
    /// available.
    pub(crate) async fn invoke(
        &self,
        conn: &mut ConnectionManager,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        let result: Result<(i64, u64), redis::RedisError> = self
            .script
            .key(key)
            .arg(times)
            .arg(window_ms)
            .invoke_async(conn)
            .await;

        match result {
            Ok((ttl, current)) => Self::parse(ttl, current),
            Err(err) if err.code() == Some("NOSCRIPT") || err.code() == Some("EXECABORT") => {
                Self::invoke_unscripted(conn, key, times, window_ms).await
            }
            Err(err) => Err(BackendError::Unavailable {
                reason: err.to_string(),
            }),
        }
    }

    async fn invoke_unscripted(
        conn: &mut ConnectionManager,
        key: &str,
        times: u64,
        window_ms: u64,
    ) -> Result<Decision, BackendError> {
        let current: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| BackendError::Unavailable {
                reason: e.to_string(),
            })?;

        let ttl: i64 = if current == 1 {
            let _: () = conn
                .pexpire(key, window_ms as i64)
                .await
                .map_err(|e| BackendError::Unavailable {
                    reason: e.to_string(),
                })?;
            window_ms as i64
        } else {
            let ttl: i64 = conn.pttl(key).await.map_err(|e| BackendError::Unavailable {
                reason: e.to_string(),
            })?;
            if ttl < 0 {
                let _: () = conn
                    .pexpire(key, window_ms as i64)
                    .await
                    .map_err(|e| BackendError::Unavailable {
                        reason: e.to_string(),
                    })?;
                window_ms as i64
            } else {
                ttl
            }
        };

        if current < 0 {
            return Err(BackendError::Script {
                reason: format!("counter went negative: {current}"),
            });
        }
        if current > times as i64 {
            Ok(Decision::reject(ttl.max(1) as u64, current as u64))
        } else {
            Ok(Decision::admit(current as u64))
        }
    }

    fn parse(ttl: i64, current: i64) -> Result<Decision, BackendError> {
        if current < 0 {
            return Err(BackendError::Script {
                reason: format!("counter went negative: {current}"),
            });
        }
        if ttl == 0 {
            Ok(Decision::admit(current as u64))
        } else if ttl > 0 {
            Ok(Decision::reject(ttl as u64, current as u64))
        } else {
            Err(BackendError::Script {
                reason: format!("unexpected negative ttl from script: {ttl}"),
            })
        }
    }
}
