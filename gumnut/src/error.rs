use facet::Facet;

/// Errors that abort a matching run.
///
/// None of these are recoverable: each one means an invariant of the search
/// was violated, or the caller asked it to stop.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum MatchError {
    /// relation class {class} was not seen when the class index was built
    UnknownRelationClass { class: String },

    /// frontier exhausted after {steps} steps without reaching a terminal state
    FrontierExhausted { steps: u64 },

    /// search not finished after {steps} steps: no terminal state was reached yet
    NotFinished { steps: u64 },

    /// search cancelled after {steps} steps
    Cancelled { steps: u64 },

    /// search state {id} was already released
    StateReleased { id: u32 },
}
