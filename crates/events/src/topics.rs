//! Topic names for queue-scoped event fan-out.
//!
//! Four visibility classes exist per queue. A connection subscribes to the
//! generic topic, to exactly one of admin / non-privileged, and to its email
//! topic when authenticated.

use ohq_core::Id;

/// Events visible to every connection on the queue.
pub fn generic(queue: &Id) -> String {
    format!("queue:{queue}")
}

/// Events visible only to course-admin connections.
pub fn admin(queue: &Id) -> String {
    format!("queue:{queue}:admin")
}

/// Anonymized events for non-admin connections.
pub fn non_privileged(queue: &Id) -> String {
    format!("queue:{queue}:nonpriv")
}

/// Events targeted at the connections of a single user.
pub fn email(queue: &Id, email: &str) -> String {
    format!("queue:{queue}:email:{email}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_classes_are_distinct_per_queue() {
        let q = Id::generate();
        let all = [
            generic(&q),
            admin(&q),
            non_privileged(&q),
            email(&q, "s@x.edu"),
        ];
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                assert_eq!(a == b, i == j);
            }
        }
    }

    #[test]
    fn email_topics_separate_users() {
        let q = Id::generate();
        assert_ne!(email(&q, "a@x.edu"), email(&q, "b@x.edu"));
    }
}
