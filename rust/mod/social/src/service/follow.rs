use perch_sql::{SQLExec, Value};

use crate::model::Profile;
use crate::service::{SocialError, SocialService};

impl SocialService {
    fn user_exists(&self, id: i64) -> Result<bool, SocialError> {
        let rows = self.sql.query(
            "SELECT 1 AS one FROM users WHERE id = ?1",
            &[Value::Integer(id)],
        )?;
        Ok(!rows.is_empty())
    }

    /// Add a follow edge actor → target. Idempotent; fails with
    /// NotFound when the target does not exist and Validation on
    /// self-follow (the schema does not enforce the latter).
    pub fn follow(&self, target_id: i64, actor_id: i64) -> Result<(), SocialError> {
        if actor_id == target_id {
            return Err(SocialError::Validation("cannot follow yourself".into()));
        }
        if !self.user_exists(target_id)? {
            return Err(SocialError::NotFound(format!("user {}", target_id)));
        }
        self.sql.exec(
            "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2)",
            &[Value::Integer(actor_id), Value::Integer(target_id)],
        )?;
        Ok(())
    }

    /// Remove the actor → target edge ("I stop following them").
    pub fn unfollow(&self, target_id: i64, actor_id: i64) -> Result<(), SocialError> {
        if !self.user_exists(target_id)? {
            return Err(SocialError::NotFound(format!("user {}", target_id)));
        }
        self.sql.exec(
            "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            &[Value::Integer(actor_id), Value::Integer(target_id)],
        )?;
        Ok(())
    }

    /// Remove the target → actor edge ("I remove them from following
    /// me"). Distinct from [`unfollow`]: it deletes the inverse
    /// direction.
    ///
    /// [`unfollow`]: SocialService::unfollow
    pub fn remove_follower(&self, target_id: i64, actor_id: i64) -> Result<(), SocialError> {
        if !self.user_exists(target_id)? {
            return Err(SocialError::NotFound(format!("user {}", target_id)));
        }
        self.sql.exec(
            "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            &[Value::Integer(target_id), Value::Integer(actor_id)],
        )?;
        Ok(())
    }

    /// Profiles following `user_id`.
    pub fn list_followers(&self, user_id: i64) -> Result<Vec<Profile>, SocialError> {
        let rows = self.sql.query(
            "SELECT u.id, u.nickname FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.following_id = ?1 ORDER BY u.id ASC",
            &[Value::Integer(user_id)],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(Profile {
                    id: r.get_i64("id")?,
                    nickname: r.get_str("nickname")?.to_string(),
                })
            })
            .collect())
    }

    /// Profiles `user_id` follows.
    pub fn list_followings(&self, user_id: i64) -> Result<Vec<Profile>, SocialError> {
        let rows = self.sql.query(
            "SELECT u.id, u.nickname FROM follows f
             JOIN users u ON u.id = f.following_id
             WHERE f.follower_id = ?1 ORDER BY u.id ASC",
            &[Value::Integer(user_id)],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(Profile {
                    id: r.get_i64("id")?,
                    nickname: r.get_str("nickname")?.to_string(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::service::testutil::{signup, test_service};
    use crate::service::SocialError;

    #[test]
    fn follow_is_idempotent() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");

        svc.follow(b, a).unwrap();
        svc.follow(b, a).unwrap();

        let followers = svc.list_followers(b).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, a);
        assert_eq!(svc.list_followings(a).unwrap().len(), 1);
    }

    #[test]
    fn unfollow_removes_forward_edge_only() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");

        svc.follow(b, a).unwrap(); // a follows b
        svc.follow(a, b).unwrap(); // b follows a
        svc.unfollow(b, a).unwrap(); // a stops following b

        assert!(svc.list_followings(a).unwrap().is_empty());
        // b still follows a.
        assert_eq!(svc.list_followers(a).unwrap().len(), 1);
    }

    #[test]
    fn remove_follower_removes_inverse_edge() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        let b = signup(&svc, "b@example.com", "b");

        svc.follow(a, b).unwrap(); // b follows a
        svc.remove_follower(b, a).unwrap(); // a removes b from their followers

        assert!(svc.list_followers(a).unwrap().is_empty());
    }

    #[test]
    fn self_follow_is_rejected() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        assert!(matches!(svc.follow(a, a), Err(SocialError::Validation(_))));
    }

    #[test]
    fn follow_missing_user_is_not_found() {
        let (_dir, svc) = test_service();
        let a = signup(&svc, "a@example.com", "a");
        assert!(matches!(svc.follow(99, a), Err(SocialError::NotFound(_))));
        assert!(matches!(svc.unfollow(99, a), Err(SocialError::NotFound(_))));
        assert!(matches!(svc.remove_follower(99, a), Err(SocialError::NotFound(_))));
    }
}
