//! Scripted pipeline for running the UI without the agent service
//!
//! Replays colored log output the way the real pipeline prints it and
//! returns a fixed ERC-20 contract.

use super::{
    ContractPipeline, LogSink, PipelineError, PipelineRequest, PipelineRun, RawClause, RawResult,
    ResultFields,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const GREEN: &str = "\x1b[1;32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

const DEMO_CONTRACT: &str = r#"// SPDX-License-Identifier: MIT
pragma solidity ^0.8.20;

import "@openzeppelin/contracts/token/ERC20/ERC20.sol";
import "@openzeppelin/contracts/token/ERC20/extensions/ERC20Burnable.sol";
import "@openzeppelin/contracts/token/ERC20/extensions/ERC20Pausable.sol";
import "@openzeppelin/contracts/access/Ownable.sol";

/// @title DemoToken
/// @notice Mintable, burnable and pausable ERC-20 token.
contract DemoToken is ERC20, ERC20Burnable, ERC20Pausable, Ownable {
    constructor(
        string memory name_,
        string memory symbol_,
        uint256 initialSupply
    ) ERC20(name_, symbol_) Ownable(msg.sender) {
        _mint(msg.sender, initialSupply);
    }

    /// @notice Mint new tokens. Owner only.
    function mint(address to, uint256 amount) external onlyOwner {
        _mint(to, amount);
    }

    /// @notice Halt all transfers. Owner only.
    function pause() external onlyOwner {
        _pause();
    }

    /// @notice Resume transfers. Owner only.
    function unpause() external onlyOwner {
        _unpause();
    }

    function _update(address from, address to, uint256 value)
        internal
        override(ERC20, ERC20Pausable)
    {
        super._update(from, to, value);
    }
}
"#;

/// Offline pipeline with canned output
pub struct DemoPipeline {
    step_delay: Duration,
}

impl DemoPipeline {
    /// Create a demo pipeline that pauses `step_delay` between log lines
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }

    fn script(request: &PipelineRequest) -> Vec<String> {
        vec![
            format!("{CYAN}[agent]{RESET} model: {}", request.model.label()),
            format!("{CYAN}[task 1/3]{RESET} generate_smart_contract"),
            format!("  prompt: {}", first_line(&request.prompt)),
            format!("{GREEN}  ✓ draft generated{RESET}"),
            format!("{CYAN}[task 2/3]{RESET} validate_smart_contract"),
            "  compiling with solc 0.8.20".to_string(),
            format!("{GREEN}  ✓ compiled{RESET}"),
            "  deploying to local sandbox".to_string(),
            format!("{GREEN}  ✓ deployed{RESET}"),
            format!("{CYAN}[task 3/3]{RESET} refine_contract"),
            format!("{YELLOW}  no errors reported, refinement skipped{RESET}"),
            format!("{GREEN}[agent] pipeline complete{RESET}"),
        ]
    }

    fn contract() -> RawResult {
        RawResult::Object {
            type_name: "SmartContract".to_string(),
            fields: ResultFields {
                contract_code: Some(DEMO_CONTRACT.to_string()),
                clauses: vec![
                    RawClause::Object {
                        title: Some("Owner-only minting".to_string()),
                        description: Some(
                            "New supply can only be created by the contract owner.".to_string(),
                        ),
                    },
                    RawClause::Object {
                        title: Some("Burning".to_string()),
                        description: Some(
                            "Holders may destroy their own tokens to reduce supply.".to_string(),
                        ),
                    },
                    RawClause::Object {
                        title: Some("Emergency pause".to_string()),
                        description: Some(
                            "The owner can halt and resume all transfers.".to_string(),
                        ),
                    },
                ],
                is_compilable: Some(true),
                is_deployable: Some(true),
                compiler_errors: Some(String::new()),
                deploy_errors: Some(String::new()),
            },
        }
    }
}

impl Default for DemoPipeline {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

#[async_trait]
impl ContractPipeline for DemoPipeline {
    fn name(&self) -> &str {
        "demo"
    }

    async fn run(
        &self,
        request: &PipelineRequest,
        on_log: LogSink,
    ) -> Result<PipelineRun, PipelineError> {
        let mut log = String::new();

        for line in Self::script(request) {
            log.push_str(&line);
            log.push('\n');
            on_log(&log);

            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        debug!(log_len = log.len(), "Demo pipeline finished");

        Ok(PipelineRun {
            result: Self::contract(),
            final_log: Some(log),
        })
    }
}
