use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use penwright::auth::{seed_roles, NewAccount, TokenCodec, TokenIntent};
use penwright::config::DatabaseConfig;
use penwright::domain::AccountId;
use penwright::pagination::paginate;
use penwright::storage::{
    create_pool, AccountRepository, DbPool, PostRepository, SqlxAccountRepository,
    SqlxPostRepository, SqlxRoleRepository,
};
use std::time::Duration;
use tokio::runtime::Runtime;

const SECRET: &[u8] = b"benchmark-secret-benchmark-secret-0123";

fn bench_token_codec(c: &mut Criterion) {
    let codec = TokenCodec::new(SECRET);
    let subject = AccountId::new(42);

    let mut group = c.benchmark_group("token_codec");

    group.bench_function("mint", |b| {
        b.iter(|| {
            let token = codec.mint(TokenIntent::Auth, black_box(subject), None, 3600).unwrap();
            black_box(token)
        });
    });

    let token = codec.mint(TokenIntent::Auth, subject, None, 3600).unwrap();
    group.bench_function("verify", |b| {
        b.iter(|| {
            let verified = codec.verify(black_box(&token), TokenIntent::Auth).unwrap();
            black_box(verified)
        });
    });

    group.bench_function("verify_intent_mismatch", |b| {
        b.iter(|| {
            let result = codec.verify(black_box(&token), TokenIntent::Reset);
            black_box(result.is_err())
        });
    });

    let email_token = codec
        .mint(TokenIntent::ChangeEmail, subject, Some("new@example.com"), 3600)
        .unwrap();
    group.bench_function("verify_with_aux", |b| {
        b.iter(|| {
            let verified = codec.verify(black_box(&email_token), TokenIntent::ChangeEmail).unwrap();
            black_box(verified)
        });
    });

    group.finish();
}

fn bench_paginate(c: &mut Criterion) {
    c.bench_function("paginate_last_page", |b| {
        b.iter(|| black_box(paginate(black_box(95_000), black_box(-1), black_box(20))))
    });
}

async fn seed_posts(count: usize) -> DbPool {
    let config = DatabaseConfig { url: "sqlite::memory:".to_string(), ..Default::default() };
    let pool = create_pool(&config).await.unwrap();
    let roles = seed_roles(&SqlxRoleRepository::new(pool.clone())).await.unwrap();
    let author = SqlxAccountRepository::new(pool.clone())
        .create_account(NewAccount {
            email: "bench@example.com".to_string(),
            username: "bench".to_string(),
            password_hash: "hash".to_string(),
            role_id: roles[0].id,
            confirmed: true,
        })
        .await
        .unwrap();

    let posts = SqlxPostRepository::new(pool.clone());
    for i in 0..count {
        posts.create_post(author.id, &format!("Benchmark post {}", i)).await.unwrap();
    }
    pool
}

fn bench_list_posts(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("post_listing");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    let pool = rt.block_on(seed_posts(1000));
    let repo = SqlxPostRepository::new(pool);

    for page_size in [20i64, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::new("list_posts", page_size), page_size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let posts = repo.list_posts(black_box(0), black_box(size)).await.unwrap();
                black_box(posts)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_token_codec, bench_paginate, bench_list_posts);
criterion_main!(benches);
