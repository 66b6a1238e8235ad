// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use std::time::{Duration, Instant};
use tracing::{info_span, Span};
use uuid::Uuid;

/// Everything one submission carries through its stages. Each submission
/// gets its own, so a superseded run can only ever see its own question.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub id: u64,
    pub trace_id: Uuid,
    pub question: String,
    started_at: Instant,
}

impl SubmissionContext {
    pub fn new<S: Into<String>>(id: u64, question: S) -> Self {
        Self {
            id,
            trace_id: Uuid::new_v4(),
            question: question.into(),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn span(&self) -> Span {
        info_span!("submission", id = self.id, trace_id = %self.trace_id)
    }
}
