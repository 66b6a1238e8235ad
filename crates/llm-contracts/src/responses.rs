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

use crate::types::ChartConfig;
use serde::{Deserialize, Serialize};

/// Outcome of chart inference. `config: None` means the result is best shown
/// as a table only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChartGeneration {
    pub config: Option<ChartConfig>,
}

impl ChartGeneration {
    pub fn table_only() -> Self {
        Self { config: None }
    }

    pub fn with_config(config: ChartConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

/// Plain-language explanation of one fragment of a generated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExplanation {
    pub section: String,
    pub explanation: String,
}
