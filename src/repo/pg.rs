use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use super::*;
use crate::auth::Role;

const MEMBER_COLS: &str = "id, username, password_hash, first_name, last_name, birth_date, role, created_on, blocked_by, blocked_on, blocked_end, profile_image";
const TOPIC_COLS: &str = "id, title, description, created_by, created_on, edited_by, edited_on, locked_by, locked_on, removed_by, removed_on";
const THREAD_COLS: &str = "id, topic_id, subject, created_by, created_on, edited_by, edited_on, locked_by, locked_on, removed_by, removed_on";
const POST_COLS: &str = "id, thread_id, content, created_by, created_on, edited_by, edited_on, locked_by, locked_on";

/// Every column that references a member as the actor of something.
const ACTOR_COLUMNS: &[(&str, &str)] = &[
    ("topics", "created_by"), ("topics", "edited_by"), ("topics", "locked_by"), ("topics", "removed_by"),
    ("threads", "created_by"), ("threads", "edited_by"), ("threads", "locked_by"), ("threads", "removed_by"),
    ("posts", "created_by"), ("posts", "edited_by"), ("posts", "locked_by"),
    ("members", "blocked_by"),
];

#[derive(Clone)]
pub struct PgRepo { pool: Pool<Postgres> }

impl PgRepo {
    pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
}

fn db_err(e: sqlx::Error) -> RepoError {
    match e {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::Conflict,
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => RepoError::NotFound,
        other => RepoError::Internal(other.to_string()),
    }
}

fn member_from_row(row: &PgRow) -> Result<Member, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = Role::parse(&role).ok_or_else(|| sqlx::Error::Decode(format!("unknown role '{role}'").into()))?;
    Ok(Member {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        birth_date: row.try_get("birth_date")?,
        role,
        created_on: row.try_get("created_on")?,
        blocked_by: row.try_get("blocked_by")?,
        blocked_on: row.try_get("blocked_on")?,
        blocked_end: row.try_get("blocked_end")?,
        profile_image: row.try_get("profile_image")?,
    })
}

#[async_trait]
impl MemberRepo for PgRepo {
    async fn list_members(&self) -> RepoResult<Vec<Member>> {
        let rows = sqlx::query(&format!("SELECT {MEMBER_COLS} FROM members ORDER BY id"))
            .fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(member_from_row).collect::<Result<_, _>>().map_err(db_err)
    }

    async fn member_names(&self) -> RepoResult<Vec<(Id, String)>> {
        let rows = sqlx::query("SELECT id, username FROM members")
            .fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter()
            .map(|r| -> Result<(Id, String), sqlx::Error> { Ok((r.try_get("id")?, r.try_get("username")?)) })
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn get_member(&self, id: Id) -> RepoResult<Member> {
        let row = sqlx::query(&format!("SELECT {MEMBER_COLS} FROM members WHERE id=$1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        member_from_row(&row).map_err(db_err)
    }

    async fn find_member(&self, username: &str) -> RepoResult<Member> {
        let row = sqlx::query(&format!("SELECT {MEMBER_COLS} FROM members WHERE lower(username)=lower($1)"))
            .bind(username)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        member_from_row(&row).map_err(db_err)
    }

    async fn create_member(&self, new: NewMember) -> RepoResult<Member> {
        let row = sqlx::query(&format!(
            "INSERT INTO members (username, password_hash, first_name, last_name, birth_date, role) \
             VALUES ($1,$2,$3,$4,$5,$6) RETURNING {MEMBER_COLS}"
        ))
            .bind(&new.username)
            .bind(&new.password_hash)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(new.birth_date)
            .bind(new.role.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)?;
        member_from_row(&row).map_err(db_err)
    }

    async fn save_member(&self, m: &Member) -> RepoResult<()> {
        let res = sqlx::query(
            "UPDATE members SET username=$2, password_hash=$3, first_name=$4, last_name=$5, birth_date=$6, \
             role=$7, blocked_by=$8, blocked_on=$9, blocked_end=$10, profile_image=$11 WHERE id=$1"
        )
            .bind(m.id)
            .bind(&m.username)
            .bind(&m.password_hash)
            .bind(&m.first_name)
            .bind(&m.last_name)
            .bind(m.birth_date)
            .bind(m.role.as_str())
            .bind(m.blocked_by)
            .bind(m.blocked_on)
            .bind(m.blocked_end)
            .bind(m.profile_image.as_deref())
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn member_activity(&self, id: Id) -> RepoResult<MemberActivity> {
        let row = sqlx::query(
            "SELECT (SELECT count(*) FROM threads WHERE created_by=m.id) AS threads, \
                    (SELECT count(*) FROM posts WHERE created_by=m.id) AS posts \
             FROM members m WHERE m.id=$1"
        )
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(MemberActivity {
            threads: row.try_get("threads").map_err(db_err)?,
            posts: row.try_get("posts").map_err(db_err)?,
        })
    }

    async fn delete_member(&self, id: Id, sentinel: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for (table, column) in ACTOR_COLUMNS {
            sqlx::query(&format!("UPDATE {table} SET {column}=$1 WHERE {column}=$2"))
                .bind(sentinel)
                .bind(id)
                .execute(&mut *tx).await.map_err(db_err)?;
        }
        let res = sqlx::query("DELETE FROM members WHERE id=$1")
            .bind(id)
            .execute(&mut *tx).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl TopicRepo for PgRepo {
    async fn list_topics(&self, include_removed: bool) -> RepoResult<Vec<Topic>> {
        sqlx::query_as::<_, Topic>(&format!(
            "SELECT {TOPIC_COLS} FROM topics WHERE $1 OR removed_by IS NULL ORDER BY id"
        ))
            .bind(include_removed)
            .fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn get_topic(&self, id: Id) -> RepoResult<Topic> {
        sqlx::query_as::<_, Topic>(&format!("SELECT {TOPIC_COLS} FROM topics WHERE id=$1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn create_topic(&self, new: NewTopic, actor: Id) -> RepoResult<Topic> {
        sqlx::query_as::<_, Topic>(&format!(
            "INSERT INTO topics (title, description, created_by) VALUES ($1,$2,$3) RETURNING {TOPIC_COLS}"
        ))
            .bind(&new.title)
            .bind(&new.description)
            .bind(actor)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn save_topic(&self, t: &Topic) -> RepoResult<()> {
        let res = sqlx::query(
            "UPDATE topics SET title=$2, description=$3, edited_by=$4, edited_on=$5, locked_by=$6, locked_on=$7, \
             removed_by=$8, removed_on=$9 WHERE id=$1"
        )
            .bind(t.id)
            .bind(&t.title)
            .bind(&t.description)
            .bind(t.edited_by)
            .bind(t.edited_on)
            .bind(t.locked_by)
            .bind(t.locked_on)
            .bind(t.removed_by)
            .bind(t.removed_on)
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}

#[async_trait]
impl ThreadRepo for PgRepo {
    async fn list_threads(&self, topic_id: Id, include_removed: bool) -> RepoResult<Vec<Thread>> {
        sqlx::query_as::<_, Thread>(&format!(
            "SELECT {THREAD_COLS} FROM threads WHERE topic_id=$1 AND ($2 OR removed_by IS NULL) \
             ORDER BY created_on DESC, id DESC"
        ))
            .bind(topic_id)
            .bind(include_removed)
            .fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn get_thread(&self, id: Id) -> RepoResult<Thread> {
        sqlx::query_as::<_, Thread>(&format!("SELECT {THREAD_COLS} FROM threads WHERE id=$1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn create_thread(&self, topic_id: Id, new: NewThread, actor: Id) -> RepoResult<(Thread, Post)> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let thread = sqlx::query_as::<_, Thread>(&format!(
            "INSERT INTO threads (topic_id, subject, created_by) VALUES ($1,$2,$3) RETURNING {THREAD_COLS}"
        ))
            .bind(topic_id)
            .bind(&new.subject)
            .bind(actor)
            .fetch_one(&mut *tx).await.map_err(db_err)?;
        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (thread_id, content, created_by, created_on) VALUES ($1,$2,$3,$4) RETURNING {POST_COLS}"
        ))
            .bind(thread.id)
            .bind(&new.content)
            .bind(actor)
            .bind(thread.created_on)
            .fetch_one(&mut *tx).await.map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok((thread, post))
    }

    async fn save_thread(&self, t: &Thread) -> RepoResult<()> {
        let res = sqlx::query(
            "UPDATE threads SET subject=$2, edited_by=$3, edited_on=$4, locked_by=$5, locked_on=$6, \
             removed_by=$7, removed_on=$8 WHERE id=$1"
        )
            .bind(t.id)
            .bind(&t.subject)
            .bind(t.edited_by)
            .bind(t.edited_on)
            .bind(t.locked_by)
            .bind(t.locked_on)
            .bind(t.removed_by)
            .bind(t.removed_on)
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn delete_thread(&self, id: Id) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM posts WHERE thread_id=$1")
            .bind(id)
            .execute(&mut *tx).await.map_err(db_err)?;
        let res = sqlx::query("DELETE FROM threads WHERE id=$1")
            .bind(id)
            .execute(&mut *tx).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepo for PgRepo {
    async fn list_posts(&self, thread_id: Id) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLS} FROM posts WHERE thread_id=$1 ORDER BY created_on ASC, id ASC"
        ))
            .bind(thread_id)
            .fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn get_post(&self, id: Id) -> RepoResult<Post> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLS} FROM posts WHERE id=$1"))
            .bind(id)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn create_post(&self, thread_id: Id, new: NewPost, actor: Id) -> RepoResult<Post> {
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (thread_id, content, created_by) VALUES ($1,$2,$3) RETURNING {POST_COLS}"
        ))
            .bind(thread_id)
            .bind(&new.content)
            .bind(actor)
            .fetch_one(&self.pool).await.map_err(db_err)
    }

    async fn save_post(&self, p: &Post) -> RepoResult<()> {
        let res = sqlx::query(
            "UPDATE posts SET content=$2, edited_by=$3, edited_on=$4, locked_by=$5, locked_on=$6 WHERE id=$1"
        )
            .bind(p.id)
            .bind(&p.content)
            .bind(p.edited_by)
            .bind(p.edited_on)
            .bind(p.locked_by)
            .bind(p.locked_on)
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }

    async fn delete_post(&self, id: Id) -> RepoResult<()> {
        let res = sqlx::query("DELETE FROM posts WHERE id=$1")
            .bind(id)
            .execute(&self.pool).await.map_err(db_err)?;
        if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
        Ok(())
    }
}
