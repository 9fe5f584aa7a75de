#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    use crate::models::{AchievementType, LedgerEntry, NewAchievement, NewToken, PointEventKind, Rarity, TokenPatch};

    // These tests need a Postgres instance at DATABASE_URL.
    // sqlx::test creates a fresh database per test and applies ./migrations.

    fn gpa_achievement(owner: &str) -> NewAchievement {
        NewAchievement {
            owner_id: owner.to_string(),
            achievement_type: AchievementType::Gpa,
            title: Some("Dean's list".to_string()),
            institution: Some("Stanford University".to_string()),
            gpa_value: Some(dec!(3.80)),
            verified_at: None,
        }
    }

    fn level_one(owner: &str, nft_type: &str, points: i64) -> NewToken {
        NewToken {
            owner_id: owner.to_string(),
            nft_type: nft_type.to_string(),
            level: 1,
            rarity: Rarity::Common,
            evolution_points: points,
            is_composite: false,
            stacked_achievement_ids: vec![],
        }
    }

    fn initial(points: i64) -> LedgerEntry {
        LedgerEntry::award(points, "initial points")
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_verify_and_mint_round_trip(pool: PgPool) -> sqlx::Result<()> {
        let store = PgTokenStore::new(pool);

        let achievement = store.create_achievement(&gpa_achievement("0xowner")).await.unwrap();
        assert!(!achievement.verified);
        assert_eq!(achievement.gpa_value, Some(dec!(3.80)));

        let (verified, token) = store
            .verify_and_mint(achievement.id, Utc::now(), &level_one("0xowner", "gpa_guardian", 80), &initial(80))
            .await
            .unwrap();
        assert!(verified.verified);
        assert_eq!(token.achievement_id, achievement.id);
        assert_eq!(token.version, 0);

        let again = store
            .verify_and_mint(achievement.id, Utc::now(), &level_one("0xowner", "gpa_guardian", 80), &initial(80))
            .await;
        assert!(matches!(again, Err(DatabaseError::IntegrityError(_))));

        let missing = store
            .verify_and_mint(achievement.id + 1000, Utc::now(), &level_one("0xowner", "gpa_guardian", 80), &initial(80))
            .await;
        assert!(matches!(missing, Err(DatabaseError::NotFound(_))));

        let by_achievement = store.get_token_by_achievement(achievement.id).await.unwrap();
        assert_eq!(by_achievement.map(|t| t.id), Some(token.id));

        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_token_is_compare_and_swap(pool: PgPool) -> sqlx::Result<()> {
        let store = PgTokenStore::new(pool);
        let achievement = store.create_achievement(&gpa_achievement("0xowner")).await.unwrap();
        let (_, token) = store
            .verify_and_mint(achievement.id, Utc::now(), &level_one("0xowner", "gpa_guardian", 100), &initial(100))
            .await
            .unwrap();

        let patch = TokenPatch { level: 2, rarity: Rarity::Rare, evolution_points: 0 };
        let entry = LedgerEntry {
            delta: -100,
            reason: "evolved to level 2".to_string(),
            kind: PointEventKind::Evolution,
        };
        let updated = store.update_token(token.id, &patch, 0, &entry).await.unwrap();
        assert_eq!(updated.level, 2);
        assert_eq!(updated.version, 1);

        let stale = store.update_token(token.id, &patch, 0, &entry).await;
        assert!(matches!(stale, Err(DatabaseError::StaleWrite { .. })));

        let missing = store.update_token(token.id + 1000, &patch, 0, &entry).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound(_))));

        // Only the applied write left an entry
        let events = store.list_point_events(token.id).await.unwrap();
        assert_eq!(events.iter().map(|e| e.delta).collect::<Vec<_>>(), vec![100, -100]);

        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_composite_unique_per_owner(pool: PgPool) -> sqlx::Result<()> {
        let store = PgTokenStore::new(pool);
        let composite = NewAchievement {
            achievement_type: AchievementType::Composite,
            gpa_value: None,
            verified_at: Some(Utc::now()),
            ..gpa_achievement("0xowner")
        };
        let token = NewToken {
            level: 3,
            rarity: Rarity::Epic,
            is_composite: true,
            stacked_achievement_ids: vec![1, 2],
            ..level_one("0xowner", "academic_titan", 200)
        };

        let bonus = LedgerEntry::award(200, "stacking bonus");
        let (record, minted) = store.create_composite(&composite, &token, &bonus).await.unwrap();
        assert!(record.verified);
        assert_eq!(minted.stacked_achievement_ids, vec![1, 2]);

        let duplicate = store.create_composite(&composite, &token, &bonus).await;
        assert!(matches!(duplicate, Err(DatabaseError::IntegrityError(_))));

        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_point_ledger_order(pool: PgPool) -> sqlx::Result<()> {
        let store = PgTokenStore::new(pool);
        let achievement = store.create_achievement(&gpa_achievement("0xowner")).await.unwrap();
        let (_, token) = store
            .verify_and_mint(achievement.id, Utc::now(), &level_one("0xowner", "gpa_guardian", 60), &initial(60))
            .await
            .unwrap();

        for (version, (delta, balance)) in [(40, 100), (15, 115)].into_iter().enumerate() {
            let patch = TokenPatch { level: 1, rarity: Rarity::Common, evolution_points: balance };
            store
                .update_token(token.id, &patch, version as i64, &LedgerEntry::award(delta, "mentoring"))
                .await
                .unwrap();
        }

        let events = store.list_point_events(token.id).await.unwrap();
        assert_eq!(events.iter().map(|e| e.delta).collect::<Vec<_>>(), vec![60, 40, 15]);
        assert_eq!(events[2].balance_after, 115);

        // A rejected write rolls its entry back with it
        let overdrawn = TokenPatch { level: 1, rarity: Rarity::Common, evolution_points: -1 };
        let rejected = store
            .update_token(token.id, &overdrawn, 2, &LedgerEntry::award(-116, "correction"))
            .await;
        assert!(matches!(rejected, Err(DatabaseError::IntegrityError(_))));
        assert_eq!(store.list_point_events(token.id).await.unwrap().len(), 3);

        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_gpa_check_constraint(pool: PgPool) -> sqlx::Result<()> {
        let store = PgTokenStore::new(pool);
        let bad = NewAchievement { gpa_value: None, ..gpa_achievement("0xowner") };

        let result = store.create_achievement(&bad).await;
        assert!(matches!(result, Err(DatabaseError::IntegrityError(_))));

        Ok(())
    }
}
