//! App actor - message loop processing UI events, network responses and ticks

use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::app::state::AppState;
use crate::constants::TICK_INTERVAL;
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
}

impl AppActor {
    pub fn new(
        state: AppState,
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
    ) -> Self {
        AppActor {
            state,
            network_tx,
            render_tx,
        }
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        let startup = self.state.start(Instant::now());
        self.send_all(startup);
        let _ = self.render_tx.send(self.state.to_render_state());

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        // Quit signal received
                        let _ = self.network_tx.send(NetworkCommand::Shutdown);
                        break;
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                Some(response) = net_rx.recv() => {
                    let follow_up = self.state.handle_response(response, Instant::now());
                    self.send_all(follow_up);
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                _ = ticker.tick() => {
                    let commands = self.state.tick(Instant::now());
                    self.send_all(commands);
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                else => break,
            }
        }
    }

    fn send_all(&self, commands: impl IntoIterator<Item = NetworkCommand>) {
        for cmd in commands {
            let _ = self.network_tx.send(cmd);
        }
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        let now = Instant::now();
        match event {
            // Login
            UiEvent::LoginChar(c) => self.state.login_char(c),
            UiEvent::LoginBackspace => self.state.login_backspace(),
            UiEvent::LoginNextField => self.state.login_next_field(),
            UiEvent::SubmitLogin => {
                let cmd = self.state.submit_login(now);
                self.send_all(cmd);
            }

            // Dashboard
            UiEvent::SelectPrev => self.state.select_prev(),
            UiEvent::SelectNext => self.state.select_next(),
            UiEvent::UsePlug => {
                let cmd = self.state.use_selected();
                self.send_all(cmd);
            }
            UiEvent::LeavePlug => {
                let cmd = self.state.leave_selected();
                self.send_all(cmd);
            }
            UiEvent::Refresh => {
                let cmd = self.state.refresh();
                self.send_all(cmd);
            }
            UiEvent::OpenAdmin => {
                let commands = self.state.open_admin();
                self.send_all(commands);
            }
            UiEvent::Logout => {
                let cmd = self.state.logout();
                self.send_all(cmd);
            }

            // Admin console
            UiEvent::AdminSwitchPanel => self.state.admin.switch_panel(),
            UiEvent::AdminUp => self.state.admin.move_up(),
            UiEvent::AdminDown => self.state.admin.move_down(),
            UiEvent::AdminLeft => self.state.admin.move_left(),
            UiEvent::AdminRight => self.state.admin.move_right(),
            UiEvent::AdminNewUser => self.state.admin_new_user(),
            UiEvent::AdminResetPassword => self.state.admin_reset_password(),
            UiEvent::AdminDeleteUser => self.state.admin_delete_user(now),
            UiEvent::AdminEditPermissions => self.state.admin_edit_permissions(now),
            UiEvent::AdminTogglePermission => {
                let cmd = self.state.admin_toggle_permission();
                self.send_all(cmd);
            }
            UiEvent::AdminReload => {
                let commands = self.state.admin_reload();
                self.send_all(commands);
            }
            UiEvent::BackToDashboard => {
                let commands = self.state.back_to_dashboard(now);
                self.send_all(commands);
            }

            // Popups
            UiEvent::PopupChar(c) => self.state.admin.input_char(c),
            UiEvent::PopupBackspace => self.state.admin.backspace(),
            UiEvent::PopupNextField => self.state.admin.next_field(),
            UiEvent::PopupSubmit => {
                let cmd = self.state.popup_submit(now);
                self.send_all(cmd);
            }
            UiEvent::PopupCancel | UiEvent::ConfirmNo => self.state.popup_cancel(),
            UiEvent::ConfirmYes => {
                let cmd = self.state.confirm_delete();
                self.send_all(cmd);
            }
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}
