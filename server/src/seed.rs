//! Random sample data for demos and local testing.

use chrono::{DateTime, Duration, Utc};
use common::{Incident, Severity, Status};
use rand::Rng;
use uuid::Uuid;

pub const DEFAULT_COUNT: usize = 200;

/// `created_at` falls on one of this many days before now.
pub const MAX_AGE_DAYS: i64 = 90;

const SERVICES: &[&str] = &[
    "Auth Service",
    "Payment Service",
    "User Service",
    "API Gateway",
    "Database",
    "Cache Layer",
    "Email Service",
    "Notification Service",
    "Analytics Service",
    "Storage Service",
];

const OWNERS: &[Option<&str>] = &[
    Some("john@example.com"),
    Some("sarah@example.com"),
    Some("mike@example.com"),
    Some("emma@example.com"),
    Some("david@example.com"),
    None,
];

const TITLES: &[&str] = &[
    "High latency detected",
    "Service unavailable",
    "Database connection timeout",
    "Memory leak detected",
    "API rate limit exceeded",
    "Failed deployment",
    "Disk space critical",
    "SSL certificate expiring",
    "Authentication failures",
    "Payment processing errors",
    "Cache invalidation issue",
    "CDN performance degradation",
    "Load balancer misconfiguration",
    "Background job failures",
    "5xx errors spike",
    "Slow query performance",
    "Network connectivity issues",
    "Third-party API outage",
    "Data inconsistency detected",
    "Security vulnerability found",
];

const SUMMARIES: &[Option<&str>] = &[
    Some("System experiencing degraded performance due to high traffic load."),
    Some("Critical service outage affecting multiple customers."),
    Some("Database queries timing out, investigating connection pool."),
    Some("Memory usage increasing steadily, potential memory leak in recent deployment."),
    Some("Rate limiting triggered due to unusual traffic patterns."),
    Some("Deployment rolled back due to failing health checks."),
    Some("Available disk space below 10%, cleanup required."),
    Some("SSL certificate expires in 7 days, renewal needed."),
    Some("Multiple authentication failures reported by users."),
    Some("Payment gateway returning errors for credit card transactions."),
    None,
];

pub fn generate<R: Rng + ?Sized>(rng: &mut R, count: usize, now: DateTime<Utc>) -> Vec<Incident> {
    (0..count).map(|_| random_incident(rng, now)).collect()
}

fn random_incident<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Incident {
    let days_ago = rng.gen_range(0..MAX_AGE_DAYS);
    let created_at = truncate_to_millis(now - Duration::days(days_ago));

    Incident {
        id: Uuid::new_v4().to_string(),
        title: pick(rng, TITLES).to_string(),
        service: pick(rng, SERVICES).to_string(),
        severity: *pick(rng, &Severity::ALL),
        status: *pick(rng, &Status::ALL),
        owner: pick(rng, OWNERS).map(str::to_string),
        summary: pick(rng, SUMMARIES).map(str::to_string),
        created_at,
        updated_at: created_at,
    }
}

fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, pool: &'a [T]) -> &'a T {
    // Pools are non-empty constants.
    &pool[rng.gen_range(0..pool.len())]
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::validation::check_new;
    use common::NewIncident;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generates_requested_count_within_constraints() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let incidents = generate(&mut rng, 50, now);
        assert_eq!(incidents.len(), 50);

        for incident in &incidents {
            assert_eq!(incident.created_at, incident.updated_at);
            assert!(incident.created_at <= now);
            assert!(now - incident.created_at < Duration::days(MAX_AGE_DAYS));
            let new = NewIncident {
                title: incident.title.clone(),
                service: incident.service.clone(),
                severity: incident.severity,
                status: incident.status,
                owner: incident.owner.clone(),
                summary: incident.summary.clone(),
            };
            assert!(check_new(&new).is_ok());
        }
    }

    #[test]
    fn same_seed_same_content() {
        let now = Utc::now();
        let a = generate(&mut StdRng::seed_from_u64(1), 10, now);
        let b = generate(&mut StdRng::seed_from_u64(1), 10, now);
        let titles = |v: &[Incident]| v.iter().map(|i| i.title.clone()).collect::<Vec<_>>();
        assert_eq!(titles(&a), titles(&b));
    }
}
