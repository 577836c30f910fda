use crate::types::Action;

/// Removes the most recent stroke from the tail of `log` and returns how many
/// actions were dropped.
///
/// A trailing line break is taken first so the points of the stroke it closed
/// become the tail, then points are popped up to (not including) the previous
/// line break. With the pen still down this removes the in-progress stroke.
pub fn undo_last_stroke(log: &mut Vec<Action>) -> usize {
    let before = log.len();

    if log.last().map_or(false, Action::is_line_break) {
        log.pop();
    }
    while log.last().map_or(false, |action| !action.is_line_break()) {
        log.pop();
    }

    before - log.len()
}
