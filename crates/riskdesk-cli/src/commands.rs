//! Subcommand handlers

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use riskdesk_backend::Backend;
use riskdesk_core::{RiskDesk, RouteDecision, Session, DASHBOARD_PATH};
use riskdesk_model::{
    classify, score, AssessmentId, NewInvite, ProfileUpdate, ProjectId, Rating, RiskScore,
    Role, SignoffState, Transition, UserId,
};
use std::path::PathBuf;
use tracing::info;

/// `score --likelihood L --impact I`
pub(crate) fn run_score(args: &ArgMatches) -> Result<()> {
    let likelihood = Rating::new(*args.get_one::<u8>("likelihood").context("likelihood")?)?;
    let impact = Rating::new(*args.get_one::<u8>("impact").context("impact")?)?;
    let value = score(likelihood, impact);
    println!("{value} ({})", classify(value));
    Ok(())
}

/// `classify <SCORE>`
pub(crate) fn run_classify(args: &ArgMatches) -> Result<()> {
    let value = RiskScore::new(*args.get_one::<u8>("score").context("score")?)?;
    let level = classify(value);
    println!("{} ({})", level, level.colour());
    Ok(())
}

fn state_label(state: SignoffState) -> &'static str {
    match state {
        SignoffState::NotRequired => "not required",
        SignoffState::Required => "awaiting signature",
        SignoffState::Signed => "signed",
    }
}

fn assessment_arg(args: &ArgMatches, fallback: Option<AssessmentId>) -> Result<AssessmentId> {
    match args.get_one::<AssessmentId>("ra").copied().or(fallback) {
        Some(id) => Ok(id),
        None => bail!("--ra is required"),
    }
}

/// Commands that act on behalf of a signed-in user
pub(crate) struct SessionCommands<'a, B> {
    desk: &'a RiskDesk<B>,
    session: Session,
    /// Assessment used when `--ra` is omitted
    default_ra: Option<AssessmentId>,
}

impl<'a, B: Backend> SessionCommands<'a, B> {
    /// Open a session for `token`
    pub(crate) async fn open(
        desk: &'a RiskDesk<B>,
        token: &str,
        default_ra: Option<AssessmentId>,
    ) -> Result<Self> {
        let session = desk
            .open_session(token)
            .await
            .context("could not open a session")?;
        Ok(Self {
            desk,
            session,
            default_ra,
        })
    }

    pub(crate) async fn dispatch(self, name: &str, args: &ArgMatches) -> Result<()> {
        let gate = self.desk.route_guard(&self.session, DASHBOARD_PATH);
        if name != "profile" && matches!(gate, RouteDecision::Redirect(_)) {
            bail!(
                "complete your profile first: \
                 riskdesk profile --first-name <NAME> --last-name <NAME>"
            );
        }
        match name {
            "profile" => self.profile(args).await,
            "projects" => self.projects().await,
            "project" => self.project(args).await,
            "show" => self.show(args).await,
            "export" => self.export(args).await,
            "require" => self.require(args).await,
            "sign" => self.sign(args).await,
            "members" => self.members().await,
            "invite" => self.invite(args).await,
            "role" => self.role(args).await,
            other => bail!("unknown command '{other}'"),
        }
    }

    async fn profile(&self, args: &ArgMatches) -> Result<()> {
        let first = args.get_one::<String>("first-name").context("first name")?;
        let last = args.get_one::<String>("last-name").context("last name")?;
        let mut update = ProfileUpdate::new(first.as_str(), last.as_str());
        if let Some(job) = args.get_one::<String>("job-title") {
            update = update.with_job_title(job.as_str());
        }
        let session = self.desk.complete_profile(&self.session, update).await?;
        println!(
            "Profile saved for {}",
            session.first_name.as_deref().unwrap_or_default()
        );
        Ok(())
    }

    async fn projects(&self) -> Result<()> {
        let projects = self.desk.list_projects(&self.session).await?;
        if projects.is_empty() {
            println!("No projects yet.");
        }
        for project in projects {
            println!(
                "{}  {}  [{}]  edited {}",
                project.id,
                project.name,
                project.reference_display(),
                project.last_edited_at.format("%Y-%m-%d %H:%M")
            );
        }
        Ok(())
    }

    async fn project(&self, args: &ArgMatches) -> Result<()> {
        let id = *args.get_one::<ProjectId>("id").context("project id")?;
        let view = self.desk.project_view(&self.session, id).await?;
        let project = &view.project;
        println!("{} [{}]", project.name, project.reference_display());
        if let Some(address) = &project.location_address {
            println!("  Address: {address}");
        }
        if let Some(words) = project.what3words_display() {
            println!("  what3words: {words}");
        }
        println!("Assessments:");
        for ra in &view.assessments {
            println!("  {}  {}  {}", ra.id, ra.name, ra.created_at.format("%Y-%m-%d"));
        }
        println!("Dynamic risks:");
        for risk in &view.dynamic_risks {
            println!(
                "  {}  {} | {} | logged by {}{}",
                risk.logged_at.format("%Y-%m-%d %H:%M"),
                risk.risk_description,
                risk.control_measures_taken,
                risk.logger_name(),
                if risk.is_safe_to_continue { "" } else { " | NOT SAFE TO CONTINUE" }
            );
        }
        Ok(())
    }

    async fn show(&self, args: &ArgMatches) -> Result<()> {
        let ra = assessment_arg(args, self.default_ra)?;
        let view = self.desk.assessment_view(&self.session, ra).await?;
        println!(
            "{} ({}) - {}",
            view.assessment.name, view.assessment.id, view.assessment.project.name
        );
        if let Some(description) = &view.assessment.description {
            println!("  {description}");
        }
        println!("Entries:");
        for entry in &view.entries {
            let initial = entry.initial_risk();
            let resultant = entry.resultant_risk();
            println!(
                "  #{} {} | {} / {} | initial {} ({}) -> resultant {} ({})",
                entry.id,
                entry.task_description.as_deref().unwrap_or_default(),
                entry.hazard_name().unwrap_or("-"),
                entry.risk_name().unwrap_or("-"),
                initial,
                initial.level(),
                resultant,
                resultant.level()
            );
        }
        println!("Sign-off:");
        for row in &view.roster {
            let when = row
                .signed_at
                .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M")))
                .unwrap_or_default();
            println!("  {}: {}{}", row.display_name, state_label(row.state), when);
        }
        for (user, at) in view.ledger.orphaned_signatures() {
            println!("  ({user} signed at {at} but is no longer required)");
        }
        Ok(())
    }

    async fn export(&self, args: &ArgMatches) -> Result<()> {
        let ra = assessment_arg(args, self.default_ra)?;
        let Some(export) = self.desk.export_csv(&self.session, ra).await? else {
            println!("Nothing to export: the assessment has no entries.");
            return Ok(());
        };
        match args.get_one::<PathBuf>("out") {
            Some(dir) => {
                let path = dir.join(&export.file_name);
                std::fs::write(&path, &export.content)
                    .with_context(|| format!("could not write {}", path.display()))?;
                info!(path = %path.display(), "export written");
                println!("Wrote {}", path.display());
            }
            None => println!("{}", export.content),
        }
        Ok(())
    }

    async fn require(&self, args: &ArgMatches) -> Result<()> {
        let ra = assessment_arg(args, self.default_ra)?;
        let user = *args.get_one::<UserId>("user").context("user id")?;
        let outcome = if args.get_flag("remove") {
            self.desk.remove_signatory(&self.session, ra, user).await?
        } else {
            self.desk.require_signatory(&self.session, ra, user).await?
        };
        let state = self.desk.signoff_state(&self.session, ra, user).await?;
        match outcome {
            Transition::Applied => println!("Updated: {user} is {}", state_label(state)),
            Transition::Unchanged => println!("No change: {user} is {}", state_label(state)),
        }
        Ok(())
    }

    async fn sign(&self, args: &ArgMatches) -> Result<()> {
        let ra = assessment_arg(args, self.default_ra)?;
        let signature = self.desk.sign(&self.session, ra, self.session.user_id).await?;
        println!(
            "Signed {} at {}",
            signature.ra_id,
            signature.signed_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    async fn members(&self) -> Result<()> {
        for member in self.desk.team_members(&self.session).await? {
            println!("{}  {}  {}", member.id, member.display_name(), member.role);
        }
        Ok(())
    }

    async fn invite(&self, args: &ArgMatches) -> Result<()> {
        let email = args.get_one::<String>("email").context("email")?;
        let role = if args.get_flag("admin") {
            Role::TeamAdmin
        } else {
            Role::User
        };
        let invite = self
            .desk
            .invite_member(&self.session, NewInvite::new(email.as_str()).with_role(role))
            .await?;
        println!("Invited {} as {} (token {})", invite.email, invite.role, invite.token);
        Ok(())
    }

    async fn role(&self, args: &ArgMatches) -> Result<()> {
        let user = *args.get_one::<UserId>("user").context("user id")?;
        let role: Role = args
            .get_one::<String>("role")
            .context("role")?
            .parse()?;
        self.desk.change_role(&self.session, user, role).await?;
        println!("{user} is now {role}");
        Ok(())
    }
}
