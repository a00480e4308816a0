use luisbot_core::Activity;

/// The single channel a handler uses to read the inbound activity and
/// write outbound replies. Owned by the hosting layer for the duration of
/// one turn and not retained beyond it.
pub struct TurnContext {
    activity: Activity,
    replies: Vec<Activity>,
}

impl TurnContext {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity,
            replies: Vec::new(),
        }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Queue a plain-text reply threaded back along the inbound activity.
    pub fn send_activity(&mut self, text: &str) {
        let reply = self.activity.reply(text);
        self.replies.push(reply);
    }

    pub fn replies(&self) -> &[Activity] {
        &self.replies
    }

    pub fn into_replies(self) -> Vec<Activity> {
        self.replies
    }
}
