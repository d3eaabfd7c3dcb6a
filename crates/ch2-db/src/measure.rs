//! Persisted rankings of journal values within an interval.

use std::cmp::Ordering;

use rusqlite::{Connection, params};

use ch2_core::{JournalValue, SourceKind, rank_by};

use crate::source::get_source;
use crate::{Database, DbError, SourceRecord, StatisticJournal};

/// One journal value ranked within one interval.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticMeasure {
    pub id: i64,
    pub statistic_journal_id: i64,
    /// The interval source that produced the ranking.
    pub source_id: i64,
    pub rank: i64,
    pub percentile: f64,
    pub quartile: Option<i64>,
}

fn query_measures(
    conn: &Connection,
    column: &str,
    id: i64,
) -> Result<Vec<StatisticMeasure>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "
        SELECT id, statistic_journal_id, source_id, rank, percentile, quartile
        FROM statistic_measure
        WHERE {column} = ?
        ORDER BY rank ASC, id ASC
        "
    ))?;
    let rows = stmt.query_map([id], |row| {
        Ok(StatisticMeasure {
            id: row.get(0)?,
            statistic_journal_id: row.get(1)?,
            source_id: row.get(2)?,
            rank: row.get(3)?,
            percentile: row.get(4)?,
            quartile: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Database {
    /// Ranks `entries` within `interval` and replaces any measures the interval
    /// produced before.
    ///
    /// `better` orders two values best first. Ties keep the order of `entries`.
    /// The new rankings are computed before anything is deleted, and the
    /// replacement runs in one transaction, so a failure keeps the old measures.
    pub fn compute_measures<F>(
        &mut self,
        interval: &SourceRecord,
        entries: &[StatisticJournal],
        mut better: F,
    ) -> Result<Vec<StatisticMeasure>, DbError>
    where
        F: FnMut(&JournalValue, &JournalValue) -> Ordering,
    {
        let stored = get_source(&self.conn, interval.id)?;
        if stored.is_none_or(|source| source.kind != SourceKind::Interval) {
            return Err(DbError::NotAnInterval {
                source_id: interval.id,
            });
        }

        let rankings = rank_by(entries, |a, b| better(&a.value, &b.value));

        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM statistic_measure WHERE source_id = ?",
            [interval.id],
        )?;
        let mut measures = Vec::with_capacity(rankings.len());
        for ranking in rankings {
            let journal = &entries[ranking.index];
            let rank = i64::try_from(ranking.rank).unwrap_or(i64::MAX);
            let quartile = ranking.quartile.map(i64::from);
            tx.execute(
                "
                INSERT INTO statistic_measure
                    (statistic_journal_id, source_id, rank, percentile, quartile)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![journal.id, interval.id, rank, ranking.percentile, quartile],
            )?;
            measures.push(StatisticMeasure {
                id: tx.last_insert_rowid(),
                statistic_journal_id: journal.id,
                source_id: interval.id,
                rank,
                percentile: ranking.percentile,
                quartile,
            });
        }
        tx.commit()?;

        tracing::debug!(
            interval = interval.id,
            removed,
            inserted = measures.len(),
            "replaced interval measures"
        );
        Ok(measures)
    }

    /// Measures produced by an interval, best first.
    pub fn measures_for_source(&self, source_id: i64) -> Result<Vec<StatisticMeasure>, DbError> {
        query_measures(&self.conn, "source_id", source_id)
    }

    /// Every ranking of one journal entry, across intervals.
    pub fn measures_for_journal(
        &self,
        statistic_journal_id: i64,
    ) -> Result<Vec<StatisticMeasure>, DbError> {
        query_measures(&self.conn, "statistic_journal_id", statistic_journal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ch2_core::{MeasureOrder, Owner, Schedule};
    use chrono::{Duration, NaiveDate};

    use crate::{IntervalRecord, NewStatistic, local_midnight_to_utc};

    struct Fixture {
        db: Database,
        interval: IntervalRecord,
        journals: Vec<StatisticJournal>,
    }

    fn fixture(distances: &[i64]) -> Fixture {
        let mut db = Database::open_in_memory().unwrap();
        let activity = Owner::new("activity").unwrap();
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let finish = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap();
        let interval = db
            .add_interval(
                &Schedule::new("m").unwrap(),
                start,
                finish,
                &Owner::new("summary").unwrap(),
            )
            .unwrap();

        let midnight = local_midnight_to_utc(start);
        let mut journals = Vec::new();
        for (day, distance) in (1..).zip(distances) {
            let source = db
                .add_source(SourceKind::Activity, midnight + Duration::days(day))
                .unwrap();
            journals.push(
                db.upsert_statistic(&NewStatistic {
                    name: "Distance",
                    units: Some("m"),
                    summary: Some("[max]"),
                    owner: &activity,
                    constraint: None,
                    source: &source,
                    value: JournalValue::Integer(Some(*distance)),
                })
                .unwrap(),
            );
        }
        Fixture {
            db,
            interval,
            journals,
        }
    }

    #[test]
    fn ranks_entries_within_interval() {
        let Fixture {
            mut db,
            interval,
            journals,
        } = fixture(&[5000, 12000, 8000]);

        let measures = db
            .compute_measures(&interval.source, &journals, |a, b| {
                MeasureOrder::Higher.compare(a, b)
            })
            .unwrap();
        let ranks: Vec<i64> = measures.iter().map(|m| m.rank).collect();
        assert_eq!(ranks, vec![3, 1, 2]);

        let stored = db.measures_for_source(interval.source.id).unwrap();
        let best: Vec<i64> = stored.iter().map(|m| m.statistic_journal_id).collect();
        assert_eq!(best, vec![journals[1].id, journals[2].id, journals[0].id]);
        assert_eq!(stored[0].quartile, Some(4));
        assert_eq!(stored[1].quartile, Some(2));
        assert_eq!(stored[2].quartile, Some(0));
        assert!((stored[0].percentile - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recomputing_replaces_previous_measures() {
        let Fixture {
            mut db,
            interval,
            journals,
        } = fixture(&[5000, 12000, 8000]);

        db.compute_measures(&interval.source, &journals, |a, b| {
            MeasureOrder::Higher.compare(a, b)
        })
        .unwrap();
        db.compute_measures(&interval.source, &journals[..2], |a, b| {
            MeasureOrder::Lower.compare(a, b)
        })
        .unwrap();

        let stored = db.measures_for_source(interval.source.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].statistic_journal_id, journals[0].id);
        assert!(db.measures_for_journal(journals[2].id).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_interval_source() {
        let Fixture {
            mut db,
            interval,
            journals,
        } = fixture(&[5000]);
        db.compute_measures(&interval.source, &journals, |a, b| {
            MeasureOrder::Higher.compare(a, b)
        })
        .unwrap();

        let activity = journals[0].source.clone();
        let err = db
            .compute_measures(&activity, &journals, |a, b| {
                MeasureOrder::Higher.compare(a, b)
            })
            .unwrap_err();
        assert!(matches!(err, DbError::NotAnInterval { source_id } if source_id == activity.id));
        assert_eq!(db.counts().unwrap().statistic_measures, 1);
    }

    #[test]
    fn deleting_interval_or_journal_cascades() {
        let Fixture {
            mut db,
            interval,
            journals,
        } = fixture(&[5000, 12000]);
        db.compute_measures(&interval.source, &journals, |a, b| {
            MeasureOrder::Higher.compare(a, b)
        })
        .unwrap();

        db.delete_source(journals[0].source.id).unwrap();
        assert_eq!(db.measures_for_source(interval.source.id).unwrap().len(), 1);

        db.delete_source(interval.source.id).unwrap();
        assert_eq!(db.counts().unwrap().statistic_measures, 0);
    }

    #[test]
    fn empty_interval_clears_measures() {
        let Fixture {
            mut db,
            interval,
            journals,
        } = fixture(&[5000, 12000]);
        db.compute_measures(&interval.source, &journals, |a, b| {
            MeasureOrder::Higher.compare(a, b)
        })
        .unwrap();

        let measures = db
            .compute_measures(&interval.source, &[], |a, b| {
                MeasureOrder::Higher.compare(a, b)
            })
            .unwrap();
        assert!(measures.is_empty());
        assert_eq!(db.counts().unwrap().statistic_measures, 0);
    }
}
