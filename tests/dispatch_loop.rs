//! Dispatch loop behaviour against a scripted request queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Method;
use negotiate_echo::auth::package::{
    AcceptStatus, ContextHandle, ContextRequirements, CredentialHandle, CredentialUse,
    PackageError, SecurityPackage,
};
use negotiate_echo::auth::{Authenticator, EmptyTokenPolicy, StaticPackage, NEGOTIATE_PACKAGE};
use negotiate_echo::dispatch::{DispatchLoop, LoopExit};
use negotiate_echo::http::{IncomingRequest, OutgoingResponse, RequestId};
use negotiate_echo::net::{RequestQueue, TransportError};
use negotiate_echo::ServiceControl;

mod common;

/// What a scripted queue observed.
#[derive(Default)]
struct Log {
    receives: usize,
    sent: Vec<(RequestId, OutgoingResponse)>,
}

/// Queue replaying a fixed script, then either closing or hanging.
struct ScriptedQueue {
    script: VecDeque<Result<IncomingRequest, TransportError>>,
    hang_when_empty: bool,
    fail_sends: bool,
    log: Arc<Mutex<Log>>,
}

impl ScriptedQueue {
    fn new(script: Vec<Result<IncomingRequest, TransportError>>) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let queue = Self {
            script: script.into(),
            hang_when_empty: false,
            fail_sends: false,
            log: log.clone(),
        };
        (queue, log)
    }

    fn hanging(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }

    fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

impl RequestQueue for ScriptedQueue {
    async fn receive(&mut self) -> Result<IncomingRequest, TransportError> {
        self.log.lock().unwrap().receives += 1;
        match self.script.pop_front() {
            Some(step) => step,
            None if self.hang_when_empty => std::future::pending().await,
            None => Err(TransportError::Closed),
        }
    }

    fn send(&mut self, id: RequestId, response: OutgoingResponse) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Other("socket reset".into()));
        }
        self.log.lock().unwrap().sent.push((id, response));
        Ok(())
    }
}

/// How a [`MisbehavingPackage`] misbehaves on accept.
#[derive(Clone, Copy)]
enum AcceptBehaviour {
    Stall(Duration),
    Panic,
}

/// A [`StaticPackage`] whose accept call stalls the calling thread or panics.
struct MisbehavingPackage {
    inner: StaticPackage,
    behaviour: AcceptBehaviour,
}

impl SecurityPackage for MisbehavingPackage {
    fn acquire_credentials_handle(
        &self,
        package: &str,
        usage: CredentialUse,
    ) -> Result<CredentialHandle, PackageError> {
        self.inner.acquire_credentials_handle(package, usage)
    }

    fn accept_security_context(
        &self,
        credentials: &CredentialHandle,
        prior: Option<&ContextHandle>,
        input: &[u8],
        requirements: ContextRequirements,
    ) -> AcceptStatus {
        match self.behaviour {
            AcceptBehaviour::Stall(duration) => std::thread::sleep(duration),
            AcceptBehaviour::Panic => panic!("security package crashed"),
        }
        self.inner
            .accept_security_context(credentials, prior, input, requirements)
    }

    fn query_context_names(&self, context: &ContextHandle) -> Option<String> {
        self.inner.query_context_names(context)
    }

    fn delete_security_context(&self, context: ContextHandle) {
        self.inner.delete_security_context(context)
    }

    fn free_credentials_handle(&self, credentials: CredentialHandle) {
        self.inner.free_credentials_handle(credentials)
    }
}

fn misbehaving(behaviour: AcceptBehaviour) -> Authenticator {
    let package = Arc::new(MisbehavingPackage {
        inner: StaticPackage::new().with_principal(b"ticket".to_vec(), common::ALICE),
        behaviour,
    });
    Authenticator::new(package, NEGOTIATE_PACKAGE, EmptyTokenPolicy::Attempt).unwrap()
}

fn authenticator(package: Arc<common::CountingPackage>) -> Authenticator {
    Authenticator::new(package, NEGOTIATE_PACKAGE, EmptyTokenPolicy::Attempt).unwrap()
}

fn authed(path: &str) -> IncomingRequest {
    IncomingRequest::new(Method::GET, path)
        .with_header("Authorization", &format!("Negotiate {}", common::ALICE_TOKEN))
}

fn dispatch(queue: ScriptedQueue, package: Arc<common::CountingPackage>, control: ServiceControl) -> DispatchLoop<ScriptedQueue> {
    DispatchLoop::new(queue, authenticator(package), control, Duration::from_millis(10))
}

#[tokio::test]
async fn test_requests_answered_in_order() {
    let package = common::alice_package();
    let first = authed("/one");
    let second = IncomingRequest::new(Method::GET, "/two");
    let ids = [first.id, second.id];
    let (queue, log) = ScriptedQueue::new(vec![Ok(first), Ok(second)]);

    let exit = dispatch(queue, package.clone(), ServiceControl::new()).run().await;
    assert_eq!(exit, LoopExit::QueueClosed);

    let log = log.lock().unwrap();
    assert_eq!(log.receives, 3);
    assert_eq!(log.sent.len(), 2);
    assert_eq!(log.sent[0].0, ids[0]);
    assert_eq!(log.sent[0].1.status, 200);
    let body = String::from_utf8(log.sent[0].1.body.clone()).unwrap();
    assert!(body.contains("URL: /one\n"));
    assert_eq!(log.sent[1].0, ids[1]);
    assert_eq!(log.sent[1].1.status, 401);
    assert_eq!(log.sent[1].1.header_value("WWW-Authenticate"), Some("Negotiate"));
}

#[tokio::test]
async fn test_paused_loop_does_not_dequeue_until_resumed() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/"))]);
    let control = ServiceControl::new();
    control.pause();

    let task = tokio::spawn(dispatch(queue, package, control.clone()).run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(log.lock().unwrap().receives, 0);

    control.resume();
    let exit = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should finish")
        .unwrap();
    assert_eq!(exit, LoopExit::QueueClosed);
    assert_eq!(log.lock().unwrap().sent.len(), 1);
}

#[tokio::test]
async fn test_stop_before_run_never_dequeues() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/"))]);
    let control = ServiceControl::new();
    control.stop();

    let exit = dispatch(queue, package.clone(), control).run().await;
    assert_eq!(exit, LoopExit::Stopped);
    assert_eq!(log.lock().unwrap().receives, 0);
    assert_eq!(package.accepts(), 0);
}

#[tokio::test]
async fn test_stop_cancels_pending_receive() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/"))]);
    let control = ServiceControl::new();

    let task = tokio::spawn(dispatch(queue.hanging(), package, control.clone()).run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(log.lock().unwrap().sent.len(), 1);

    control.stop();
    let exit = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("stop should cancel the pending receive")
        .unwrap();
    assert_eq!(exit, LoopExit::Stopped);
    assert_eq!(log.lock().unwrap().receives, 2);
}

#[tokio::test]
async fn test_stop_while_paused_exits() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/"))]);
    let control = ServiceControl::new();
    control.pause();

    let task = tokio::spawn(dispatch(queue, package, control.clone()).run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    control.stop();

    let exit = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("loop should notice stop while paused")
        .unwrap();
    assert_eq!(exit, LoopExit::Stopped);
    assert_eq!(log.lock().unwrap().receives, 0);
}

#[tokio::test]
async fn test_transport_errors_do_not_end_the_loop() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![
        Err(TransportError::ConnectionInvalid),
        Err(TransportError::Other("reset by peer".into())),
        Ok(authed("/after")),
    ]);

    let exit = dispatch(queue, package, ServiceControl::new()).run().await;
    assert_eq!(exit, LoopExit::QueueClosed);

    let log = log.lock().unwrap();
    assert_eq!(log.receives, 4);
    assert_eq!(log.sent.len(), 1);
    assert_eq!(log.sent[0].1.status, 200);
}

#[tokio::test]
async fn test_send_failures_do_not_end_the_loop() {
    let package = common::alice_package();
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/a")), Ok(authed("/b"))]);

    let exit = dispatch(queue.failing_sends(), package.clone(), ServiceControl::new())
        .run()
        .await;
    assert_eq!(exit, LoopExit::QueueClosed);
    assert_eq!(log.lock().unwrap().receives, 3);
    assert_eq!(package.accepts(), 2);
}

#[tokio::test]
async fn test_empty_token_reaches_package_through_loop() {
    let package = common::alice_package();
    let request = IncomingRequest::new(Method::GET, "/").with_header("Authorization", "Negotiate ");
    let (queue, log) = ScriptedQueue::new(vec![Ok(request)]);

    dispatch(queue, package.clone(), ServiceControl::new()).run().await;

    assert_eq!(package.accepts(), 1);
    assert_eq!(log.lock().unwrap().sent[0].1.status, 401);
}

#[tokio::test]
async fn test_slow_package_does_not_stall_the_runtime() {
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/slow"))]);
    let dispatch = DispatchLoop::new(
        queue,
        misbehaving(AcceptBehaviour::Stall(Duration::from_millis(400))),
        ServiceControl::new(),
        Duration::from_millis(10),
    );
    let started = std::time::Instant::now();
    let task = tokio::spawn(dispatch.run());

    // On this single-threaded runtime a blocking accept would hold the only
    // worker; the timer below would then fire only after the stall.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(log.lock().unwrap().sent.is_empty(), "handshake still running");

    let exit = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("loop should finish")
        .unwrap();
    assert_eq!(exit, LoopExit::QueueClosed);
    assert_eq!(log.lock().unwrap().sent[0].1.status, 200);
}

#[tokio::test]
async fn test_panicking_package_is_challenged_and_loop_continues() {
    let (queue, log) = ScriptedQueue::new(vec![Ok(authed("/a")), Ok(authed("/b"))]);
    let dispatch = DispatchLoop::new(
        queue,
        misbehaving(AcceptBehaviour::Panic),
        ServiceControl::new(),
        Duration::from_millis(10),
    );

    let exit = dispatch.run().await;
    assert_eq!(exit, LoopExit::QueueClosed);

    let log = log.lock().unwrap();
    assert_eq!(log.sent.len(), 2);
    assert!(log.sent.iter().all(|(_, response)| response.status == 401));
}
