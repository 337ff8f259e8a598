//! Bridges the engine's event callbacks into awaitable futures.
//!
//! Each await installs fresh `onsuccess`/`onerror` handlers and removes
//! them once the oneshot resolves, so the same request object can be
//! awaited repeatedly. Cursor stepping depends on this: `continue_()`
//! re-fires success on the request that opened the cursor.

use crate::error::StoreError;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{IdbRequest, IdbTransaction};

/// Waits for a single request to complete and returns its result.
pub(crate) async fn await_request(
    request: &IdbRequest,
    op: &'static str,
) -> Result<JsValue, StoreError> {
    let (tx, rx) = futures_channel::oneshot::channel::<Result<JsValue, StoreError>>();
    let tx = Rc::new(RefCell::new(Some(tx)));

    let tx_success = tx.clone();
    let onsuccess = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let request: IdbRequest = event
            .target()
            .unwrap()
            .dyn_into()
            .expect("event target should be an IdbRequest");

        let result = request.result().unwrap_or(JsValue::UNDEFINED);

        if let Some(tx) = tx_success.borrow_mut().take() {
            let _ = tx.send(Ok(result));
        }
    }) as Box<dyn FnMut(_)>);

    let tx_error = tx;
    let onerror = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let request: IdbRequest = event
            .target()
            .unwrap()
            .dyn_into()
            .expect("event target should be an IdbRequest");

        let reason = request_error_message(&request);

        if let Some(tx) = tx_error.borrow_mut().take() {
            let _ = tx.send(Err(StoreError::request(op, reason)));
        }
    }) as Box<dyn FnMut(_)>);

    request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
    request.set_onerror(Some(onerror.as_ref().unchecked_ref()));

    let result = rx
        .await
        .map_err(|_| StoreError::Other("request channel closed".to_string()))?;

    request.set_onsuccess(None);
    request.set_onerror(None);

    drop(onsuccess);
    drop(onerror);

    result
}

/// Waits for a transaction to commit.
///
/// Only `oncomplete` and `onabort` are wired: the engine fires `onerror`
/// on the failing request first and follows with `onabort` on the
/// transaction, so abort is the terminal signal.
pub(crate) async fn await_transaction(tx: &IdbTransaction) -> Result<(), StoreError> {
    let (sender, rx) = futures_channel::oneshot::channel::<Result<(), StoreError>>();
    let sender = Rc::new(RefCell::new(Some(sender)));

    let tx_complete = sender.clone();
    let oncomplete = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tx) = tx_complete.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    }) as Box<dyn FnMut(_)>);

    let tx_abort = sender;
    let onabort = Closure::wrap(Box::new(move |_: web_sys::Event| {
        if let Some(tx) = tx_abort.borrow_mut().take() {
            let _ = tx.send(Err(StoreError::TransactionAborted));
        }
    }) as Box<dyn FnMut(_)>);

    tx.set_oncomplete(Some(oncomplete.as_ref().unchecked_ref()));
    tx.set_onabort(Some(onabort.as_ref().unchecked_ref()));

    let result = rx
        .await
        .map_err(|_| StoreError::Other("transaction channel closed".to_string()))?;

    tx.set_oncomplete(None);
    tx.set_onabort(None);

    drop(oncomplete);
    drop(onabort);

    result
}

/// Extracts the DomException name and message from a failed request.
pub(crate) fn request_error_message(request: &IdbRequest) -> String {
    request
        .error()
        .ok()
        .flatten()
        .map(|e| format!("{}: {}", e.name(), e.message()))
        .unwrap_or_else(|| "unknown error".to_string())
}
