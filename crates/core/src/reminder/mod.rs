pub mod create_reminder;
pub mod delete_reminder;
pub mod fire_due_reminders;
pub mod get_reminder;
pub mod get_reminders;
pub mod update_reminder;

pub use create_reminder::CreateReminderUseCase;
pub use delete_reminder::DeleteReminderUseCase;
pub use fire_due_reminders::FireDueRemindersUseCase;
pub use get_reminder::GetReminderUseCase;
pub use get_reminders::GetRemindersUseCase;
pub use update_reminder::UpdateReminderUseCase;
