// Copyright 2026 the Layline Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

mod test_breaker;
mod test_itemize;
