pub mod services;

use super::DiffSession;
use super::action::Action;
use super::command::Command;

pub fn run(session: &mut DiffSession, command: Command) {
    match command {
        Command::Schedule(kind) => session.timers.get_mut(kind).schedule(),
        Command::Cancel(kind) => session.timers.get_mut(kind).cancel(),
        Command::Flush(kind) => {
            if session.timers.get_mut(kind).flush_now() {
                session.dispatch(Action::TimerElapsed(kind));
            }
        }
        Command::ApplyEdit {
            seq,
            side,
            text,
            request,
        } => services::apply_edit(session, seq, side, text, request),
        Command::Compare {
            seq,
            source_id,
            target_id,
        } => services::compare(session, seq, source_id, target_id),
        Command::PreviewMetadata { seq, rows } => services::preview_metadata(session, seq, rows),
        Command::CopyLines { seq, request } => services::copy_lines(session, seq, request),
        Command::Search {
            side,
            seq,
            document_id,
            keyword,
            presence,
        } => services::search(session, side, seq, document_id, keyword, presence),
        Command::FindPair {
            side,
            request_id,
            text,
            offset,
        } => services::find_pair(session, side, request_id, text, offset),
        Command::RunPanelOps {
            side,
            document_id,
            ops,
        } => services::run_panel_ops(session, side, document_id, ops),
    }
}
