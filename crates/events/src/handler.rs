/// Execute a command against an aggregate in place (no IO, no side effects).
///
/// Decide first, then apply every decided event. If `handle` rejects the
/// command nothing is applied, so the aggregate is untouched.
///
/// This is the whole lifecycle for in-process use and tests. Anything that must
/// happen between deciding and applying (outbound transfers, journal appends)
/// belongs in the infrastructure dispatcher instead.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: charityfund_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
