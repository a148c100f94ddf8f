//! Example prompt shortcuts shown in the sidebar

/// A sidebar shortcut: button label and the prompt it fills in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamplePrompt {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub static EXAMPLE_PROMPTS: [ExamplePrompt; 3] = [
    ExamplePrompt {
        label: "Create a Full ERC-20 Token (Mint/Burn/Pause)",
        prompt: "Create a complete ERC-20 token smart contract using Solidity and OpenZeppelin. \
The contract must support minting and burning (restricted to the owner), pausing of transfers, \
and safe initialization of name, symbol, and initial supply. Include clear comments, NatSpec \
documentation, and ensure the contract follows security best practices and gas-efficient design patterns.",
    },
    ExamplePrompt {
        label: "Build a DAO with Voting + Proposal Execution",
        prompt: "Generate a Solidity-based DAO governance contract that supports proposal creation, \
weighted voting, automatic proposal lifecycle transitions, and execution of approved proposals once \
quorum is met. The contract should include events, role restrictions, protections against re-entrancy, \
and clear architectural comments and NatSpec to make it upgrade-friendly and secure.",
    },
    ExamplePrompt {
        label: "NFT Marketplace with Listings + Sales + Royalties",
        prompt: "Create a secure Solidity smart contract for an NFT marketplace supporting ERC-721 tokens. \
It must enable NFT listings, purchases, cancellation of listings, and royalty support (ERC-2981 if \
available). Use safe payment patterns, prevent re-entrancy, track listings efficiently, emit all \
necessary events, and include high-quality comments and NatSpec documentation throughout the contract.",
    },
];

/// Look up a shortcut by its position in the sidebar
pub fn example(index: usize) -> Option<&'static ExamplePrompt> {
    EXAMPLE_PROMPTS.get(index)
}
