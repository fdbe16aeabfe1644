/// User actions that can be performed in the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Answer yes to the confirmation prompt
    Confirm,
    /// Answer no to the confirmation prompt
    Decline,
    /// Stop the running batch after the current item
    Cancel,
    /// Close the result screen
    Acknowledge,
    /// Scroll the item list up
    ScrollUp,
    /// Scroll the item list down
    ScrollDown,
    /// No action (for tick events)
    Tick,
}
