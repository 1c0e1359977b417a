//! Programs bound to interpreter execution contexts
//!
//! `call_program` runs an engine-side [`Program`] on behalf of one
//! [`ExecutionContext`]. The context is suspended while the program runs and
//! resumed with its outcome. Values never cross the thread boundary as
//! shared objects: arguments and the result travel in pack form.

use crate::bridge::{AsyncCallBridge, Env};
use crate::error::{BridgeError, BridgeResult};
use crate::request::{Request, RequestFuture};
use anyhow::Context as _;
use sable_value::Value;
use tracing::debug;

/// Engine-side program callable through [`AsyncCallBridge::call_program`]
///
/// Implemented for closures taking the environment and the argument list.
pub trait Program<E>: Send + 'static {
    /// Name used in logs and error context
    fn name(&self) -> &str {
        "<program>"
    }

    /// Run on the engine thread
    fn run(&self, env: &mut Env<'_, E>, args: Vec<Value>) -> anyhow::Result<Value>;
}

impl<E, F> Program<E> for F
where
    F: Fn(&mut Env<'_, E>, Vec<Value>) -> anyhow::Result<Value> + Send + 'static,
{
    fn run(&self, env: &mut Env<'_, E>, args: Vec<Value>) -> anyhow::Result<Value> {
        self(env, args)
    }
}

/// Scheduling state of an [`ExecutionContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Free to run or to start a program call
    Ready,
    /// Waiting for the program call with this request id
    Suspended { request: u64 },
}

/// Interpreter-side context that program calls suspend and resume
///
/// If the future of a program call is dropped before it resolves (a timeout,
/// a losing `select!` branch), the context is resumed with
/// [`BridgeError::Abandoned`]. The program itself still runs to completion on
/// the engine thread and its result is discarded.
#[derive(Debug)]
pub struct ExecutionContext {
    name: String,
    args: Vec<Value>,
    state: ContextState,
    last_outcome: Option<BridgeResult<Value>>,
    resumes: u64,
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            state: ContextState::Ready,
            last_outcome: None,
            resumes: 0,
        }
    }

    /// Replace the arguments passed to the next program call
    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn push_arg(&mut self, value: Value) {
        self.args.push(value);
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, ContextState::Suspended { .. })
    }

    /// Outcome the context was last resumed with
    pub fn last_outcome(&self) -> Option<&BridgeResult<Value>> {
        self.last_outcome.as_ref()
    }

    /// Number of program calls this context has been resumed from
    pub fn resume_count(&self) -> u64 {
        self.resumes
    }

    fn suspend(&mut self, request: u64) {
        self.state = ContextState::Suspended { request };
    }

    fn resume(&mut self, outcome: BridgeResult<Value>) -> BridgeResult<Value> {
        self.state = ContextState::Ready;
        self.resumes += 1;
        self.last_outcome = Some(outcome.clone());
        outcome
    }
}

impl<E: 'static> AsyncCallBridge<E> {
    /// Run `program` on the engine thread for `ctx`
    ///
    /// `ctx` is suspended until the program completes or fails, then resumed
    /// with the outcome, which is also returned.
    pub async fn call_program<P>(&self, program: P, ctx: &mut ExecutionContext) -> BridgeResult<Value>
    where
        P: Program<E>,
    {
        let future = self.submit_program(program, ctx)?;
        let mut suspension = Suspension::new(ctx);
        let request = future.await;
        suspension.finish(request)
    }

    /// [`call_program`](Self::call_program) for non-async runtime threads
    pub fn call_program_blocking<P>(&self, program: P, ctx: &mut ExecutionContext) -> BridgeResult<Value>
    where
        P: Program<E>,
    {
        let future = self.submit_program(program, ctx)?;
        let mut suspension = Suspension::new(ctx);
        let request = future.blocking_wait();
        suspension.finish(request)
    }

    fn submit_program<P>(&self, program: P, ctx: &mut ExecutionContext) -> BridgeResult<RequestFuture<String>>
    where
        P: Program<E>,
    {
        if let ContextState::Suspended { request } = ctx.state {
            return Err(BridgeError::CallFailed(format!(
                "execution context '{}' is already suspended on request {request}",
                ctx.name
            )));
        }

        let packed = Value::array(ctx.args.iter().cloned()).pack();
        let future = self.make_call(move |env: &mut Env<'_, E>| {
            let args = match Value::unpack(&packed).context("unpacking program arguments")? {
                Value::Array(arr) => arr.values(),
                other => vec![other],
            };
            let result = program
                .run(env, args)
                .with_context(|| format!("program '{}'", program.name()))?;
            Ok(result.pack())
        });

        ctx.suspend(future.id());
        debug!(context = %ctx.name, id = future.id(), "Context suspended");
        Ok(future)
    }
}

/// Resumes a suspended context if the wait for its program is cut short
struct Suspension<'a> {
    ctx: &'a mut ExecutionContext,
    pending: bool,
}

impl<'a> Suspension<'a> {
    fn new(ctx: &'a mut ExecutionContext) -> Self {
        Self { ctx, pending: true }
    }

    fn finish(&mut self, request: Request<String>) -> BridgeResult<Value> {
        self.pending = false;
        finish_program(self.ctx, request)
    }
}

impl Drop for Suspension<'_> {
    fn drop(&mut self) {
        if self.pending {
            debug!(context = %self.ctx.name, "Program call abandoned");
            let _ = self.ctx.resume(Err(BridgeError::Abandoned));
        }
    }
}

fn finish_program(ctx: &mut ExecutionContext, request: Request<String>) -> BridgeResult<Value> {
    let outcome = request
        .into_result()
        .and_then(|packed| Value::unpack(&packed).map_err(BridgeError::from));
    debug!(context = %ctx.name, ok = outcome.is_ok(), "Context resumed");
    ctx.resume(outcome)
}
