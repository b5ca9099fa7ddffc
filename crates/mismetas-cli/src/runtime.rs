// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use mismetas_app::{ActiveActivity, CursorAction, FrontendState};
use mismetas_backend::Client;
use mismetas_tui::{BackendGateway, BackendInvocation, DispatchEvent, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;

/// Gateway over the HTTP backend client. Invocations run on worker threads
/// against a cloned client, so key handling never blocks on a round trip.
pub struct HttpGateway {
    client: Client,
}

impl HttpGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl BackendGateway for HttpGateway {
    fn load(&mut self) -> Result<()> {
        self.client.load()
    }

    fn fetch(&mut self) -> Result<Option<FrontendState>> {
        self.client.fetch()
    }

    fn app_command(&mut self, command: &str) -> Result<()> {
        self.client.app_command(command)
    }

    fn cursor_action(&mut self, action: CursorAction) -> Result<()> {
        self.client.cursor_action(action)
    }

    fn set_active_activity(&mut self, activity: ActiveActivity) -> Result<()> {
        self.client.set_active_activity(activity)
    }

    fn spawn_invocation(
        &mut self,
        request_id: u64,
        invocation: BackendInvocation,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::spawn(move || {
            let mut worker = HttpGateway::new(client);
            let event = match worker.run_invocation(&invocation) {
                Ok(snapshot) => DispatchEvent::Completed {
                    request_id,
                    snapshot,
                },
                Err(error) => DispatchEvent::Failed {
                    request_id,
                    error: error.to_string(),
                },
            };
            let _ = tx.send(InternalEvent::Dispatch(event));
        });
        Ok(())
    }
}
